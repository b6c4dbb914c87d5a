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

//! HTTP surface for the audio conversion service: the orchestrator, download
//! streamer, progress and cleanup endpoints, and the router that composes them.

mod dto;
mod error;
mod handlers;
mod recovery;
mod router;
mod state;
mod validate;

pub use dto::{
    CleanupRequest, CleanupResponse, ConvertRequest, ConvertResponse, ConvertedFileEntry, ConvertedFilesResponse, DownloadQuery,
    HealthResponse, PresignedDownloadResponse, ProgressQuery,
};
pub use error::AppError;
pub use recovery::{RecoveryService, MIN_ORPHAN_AGE, STUCK_JOB_AGE};
pub use router::ApiServer;
pub use state::ApiState;
