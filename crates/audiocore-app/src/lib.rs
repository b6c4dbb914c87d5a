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

//! Binary entrypoint that wires the audio conversion service's collaborators
//! together and launches the HTTP listener and background recovery sweep.

mod bootstrap;
mod error;
mod recovery_task;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
