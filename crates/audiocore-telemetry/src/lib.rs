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

//! Structured logging and metrics for the audio conversion service.

mod init;
mod layers;
mod metrics;

pub use init::{build_sha, init_logging, LogFormat, LoggingConfig};
pub use layers::{propagate_request_id_layer, set_request_id_layer};
pub use metrics::Metrics;
