//! Multipart payload construction.
//!
//! Every upload attempt carries a fixed number of attachments, each picked
//! independently (with replacement) from the media pool.

mod builder;
mod types;

pub use builder::{PayloadBuilder, ATTACHMENTS_PER_UPLOAD};
pub use types::*;
