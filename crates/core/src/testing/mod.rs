//! Testing utilities and mock implementations.
//!
//! Provides a controllable [`MockPhotoService`] so the scheduler can be
//! exercised without a real photo hosting backend, plus fixtures for
//! building media pools.
//!
//! # Example
//!
//! ```rust,ignore
//! use floret_core::testing::{fixtures, MockPhotoService};
//!
//! let service = Arc::new(MockPhotoService::new());
//! service.set_upload_delay(Duration::from_millis(20)).await;
//!
//! let pool = fixtures::media_pool(&["a.jpg", "b.png"], &["hello"]);
//! ```

mod mock_photo_service;

pub use mock_photo_service::{MockPhotoService, RecordedCommit, RecordedUpload};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::media::{MediaPool, Picture};
    use crate::photo_api::Session;

    /// A picture whose content is derived from its name.
    pub fn picture(name: &str) -> Picture {
        Picture::new(name, format!("bytes of {}", name).into_bytes())
    }

    /// A media pool with the given picture names and captions.
    pub fn media_pool(pictures: &[&str], captions: &[&str]) -> MediaPool {
        MediaPool::new(
            pictures.iter().map(|name| picture(name)).collect(),
            captions.iter().map(|c| c.to_string()).collect(),
        )
    }

    /// A complete session for group 1, album 2.
    pub fn session() -> Session {
        Session::new("mock-token", "1", "2", "5.131")
    }
}
