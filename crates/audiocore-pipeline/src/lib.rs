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

//! The conversion pipeline: format policy, timeout sizing, phase-driven
//! progress, and the streaming/fallback data planes that move bytes from the
//! storage gateway through the transcoder and back.

mod compat;
mod error;
mod format;
mod phases;
mod pipeline;
mod tempdir;
mod timeout;

pub use compat::{check as check_compatibility, Compatibility};
pub use error::{PipelineError, Result as PipelineResult};
pub use format::{is_supported, lookup, FormatDescriptor};
pub use phases::{Phase, STREAMING_CEILING};
pub use pipeline::{ConversionPipeline, ConvertOptions};
pub use tempdir::TempJobDir;
pub use timeout::compute_timeout;
