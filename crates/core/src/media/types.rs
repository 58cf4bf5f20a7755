//! Types for the media pool.

use std::path::PathBuf;

use bytes::Bytes;
use rand::seq::IndexedRandom;
use rand::Rng;
use thiserror::Error;

/// Errors that can occur while loading media.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Directory or captions file could not be read.
    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No picture could be loaded from the directory.
    #[error("No pictures found in {0}")]
    NoPictures(PathBuf),
}

/// A picture loaded into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    /// File name (no directory), sent as the multipart file name.
    pub name: String,
    /// Raw file contents.
    pub content: Bytes,
}

impl Picture {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Pictures and captions available to upload workers.
#[derive(Debug, Clone, Default)]
pub struct MediaPool {
    pictures: Vec<Picture>,
    captions: Vec<String>,
}

impl MediaPool {
    pub fn new(pictures: Vec<Picture>, captions: Vec<String>) -> Self {
        Self { pictures, captions }
    }

    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    pub fn captions(&self) -> &[String] {
        &self.captions
    }

    /// Pick one caption uniformly at random (with replacement across calls).
    pub fn random_caption<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.captions.choose(rng).map(String::as_str)
    }

    /// Total size of all loaded pictures in bytes.
    pub fn total_bytes(&self) -> usize {
        self.pictures.iter().map(|p| p.content.len()).sum()
    }
}
