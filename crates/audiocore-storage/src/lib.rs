#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Object storage gateway for converted audio artifacts.

mod client;
mod error;
mod retry;

pub use aws_sdk_s3::primitives::ByteStream;
pub use client::{CompletedPart, MultipartUpload, ObjectMeta, ObjectSummary, StorageGateway, MULTIPART_MAX_INFLIGHT, MULTIPART_PART_SIZE};
pub use error::{Result as StorageResult, StorageError};
