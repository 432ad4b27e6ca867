//! zimdown: resumable ZIM-to-Markdown batch conversion
//!
//! Reads wiki articles out of an offline ZIM archive and writes each one's
//! main content as Markdown, with its tags and images, into a sharded
//! output tree:
//! - Memory-mapped ZIM reader with xz and zstd cluster support
//! - Boilerplate stripping and HTML-to-Markdown conversion
//! - Durable progress tracking with high-water-mark resume
//! - Consecutive-failure circuit breaker and cooperative cancellation

pub mod archive;
pub mod batch;
pub mod config;
pub mod extract;
pub mod logging;
pub mod tracker;
pub mod types;
pub mod util;

pub use config::Config;
pub use types::*;
