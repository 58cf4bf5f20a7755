//! Types for upload payloads.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while building a payload.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("media pool has no pictures")]
    EmptyPool,

    #[error("failed to encode multipart field {field}: {reason}")]
    Encoding { field: String, reason: String },
}

/// One attachment of an upload payload.
#[derive(Debug, Clone)]
pub struct PayloadPart {
    /// Form field name (`file0`, `file1`, ...).
    pub field: String,
    /// File name reported to the upload server.
    pub file_name: String,
    /// Picture bytes (shared with the media pool).
    pub content: Bytes,
}

impl PayloadPart {
    /// MIME type derived from the file extension.
    pub fn mime_type(&self) -> &'static str {
        mime_for(&self.file_name)
    }
}

/// The attachments of a single upload attempt.
#[derive(Debug, Clone, Default)]
pub struct Payload {
    parts: Vec<PayloadPart>,
}

impl Payload {
    pub fn new(parts: Vec<PayloadPart>) -> Self {
        Self { parts }
    }

    pub fn parts(&self) -> &[PayloadPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Sum of attachment sizes in bytes.
    pub fn total_bytes(&self) -> usize {
        self.parts.iter().map(|p| p.content.len()).sum()
    }

    /// Encode as a `multipart/form-data` form.
    ///
    /// Parts stream straight from the shared picture buffers. Fails as a
    /// whole if any field cannot be encoded.
    pub fn into_form(self) -> Result<Form, PayloadError> {
        let mut form = Form::new();
        for part in self.parts {
            let mime = part.mime_type();
            let length = part.content.len() as u64;
            let encoded = Part::stream_with_length(Body::from(part.content), length)
                .file_name(part.file_name)
                .mime_str(mime)
                .map_err(|e| PayloadError::Encoding {
                    field: part.field.clone(),
                    reason: e.to_string(),
                })?;
            form = form.part(part.field, encoded);
        }
        Ok(form)
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}
