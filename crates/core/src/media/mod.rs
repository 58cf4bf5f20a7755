//! In-memory media pool.
//!
//! Pictures are read from disk once at startup and shared read-only by every
//! upload worker for the rest of the run.

mod loader;
mod types;

pub use loader::{load_media_pool, split_captions, PICTURE_EXTENSIONS};
pub use types::*;
