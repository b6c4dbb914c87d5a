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

//! Environment-derived configuration for the audio conversion service.

mod error;
mod loader;
mod model;
mod validate;

pub use error::{ConfigError, Result as ConfigResult};
pub use loader::load_from_env;
pub use model::AppConfig;
