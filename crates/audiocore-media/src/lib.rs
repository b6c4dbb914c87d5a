#![deny(
    unsafe_code,
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

//! Transcoder subprocess supervision and stderr progress parsing.

mod error;
mod parser;
mod supervisor;
mod synthetic;

pub use error::{MediaError, Result as MediaResult};
pub use parser::{ParserEvent, StderrParser};
pub use supervisor::{ChildHandle, Supervisor};
pub use synthetic::{SyntheticProgress, TICK_INTERVAL};
