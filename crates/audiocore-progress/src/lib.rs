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

//! Two-tier progress channel: a fast Redis cache backed by a durable store.

mod cache;
mod channel;
mod error;

pub use cache::{RedisProgressCache, PRIMARY_TTL_SECS};
pub use channel::ProgressChannel;
pub use error::{ProgressError, Result as ProgressResult};
