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

//! Durable job store and progress fallback persistence for the conversion service.

mod error;
mod job_store;
mod model;
mod progress_fallback;

pub use error::{DataError, Result as DataResult};
pub use job_store::{JobStore, ScanFilter};
pub use model::{BlobRef, Job, JobId, JobStatus, NewJob, ProgressRecord, JOB_TTL_SECS};
pub use progress_fallback::ProgressFallbackStore;
