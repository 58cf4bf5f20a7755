//! Remote photo service abstraction.
//!
//! This module provides a `PhotoService` trait covering the upload protocol
//! (validate, get upload destination, upload binary, commit) and a VK-style
//! method API implementation.

mod types;
mod vk;

pub use types::*;
pub use vk::VkClient;
