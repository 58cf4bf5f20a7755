//! Types for photo service operations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::payload::{Payload, PayloadError};

/// Errors that can occur during photo service operations.
#[derive(Debug, Clone, Error)]
pub enum PhotoApiError {
    /// The service answered with an error envelope carrying a non-zero code.
    #[error("Error_code = {code}: {message}")]
    RemoteRejected { code: i64, message: String },

    /// The call succeeded at the transport level but the body is unusable.
    #[error("Unexpected server response: {0}")]
    UnexpectedResponse(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),
}

impl PhotoApiError {
    /// Short label used in failure logs and the upload failure metric.
    pub fn kind(&self) -> &'static str {
        match self {
            PhotoApiError::RemoteRejected { .. } => "remote_rejected",
            PhotoApiError::UnexpectedResponse(_) => "unexpected_response",
            PhotoApiError::Transport(_) => "transport",
            PhotoApiError::Timeout => "timeout",
            PhotoApiError::Payload(_) => "payload",
        }
    }
}

/// Identity used for every remote call of a run.
///
/// Built once at startup and never mutated.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    group_id: String,
    album_id: String,
    version: String,
}

impl Session {
    pub fn new(token: &str, group_id: &str, album_id: &str, version: &str) -> Self {
        Self {
            token: token.to_string(),
            group_id: group_id.to_string(),
            album_id: album_id.to_string(),
            version: version.to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn album_id(&self) -> &str {
        &self.album_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Name of the first empty identifier, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.token.is_empty() {
            Some("token")
        } else if self.group_id.is_empty() {
            Some("group_id")
        } else if self.album_id.is_empty() {
            Some("album_id")
        } else {
            None
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("group_id", &self.group_id)
            .field("album_id", &self.album_id)
            .field("version", &self.version)
            .finish()
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}_{}]", self.group_id, self.album_id)
    }
}

/// Upload server URL handed out by the service.
///
/// Valid for an unspecified time; it is fetched once per run and never refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDestination(String);

impl UploadDestination {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Proof of transfer returned by the upload server.
///
/// `server`, `photos_list` and `hash` are passed back verbatim on commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub server: i64,
    pub photos_list: String,
    pub hash: String,
    /// Album id echoed by the upload server, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aid: Option<i64>,
}

/// Remote photo hosting service.
#[async_trait]
pub trait PhotoService: Send + Sync {
    /// Returns the name of this backend (e.g., "vk").
    fn name(&self) -> &str;

    /// Check that the session's token, group and album fit together.
    async fn validate(&self, session: &Session) -> Result<(), PhotoApiError>;

    /// Ask for an upload server URL for the session's album.
    async fn upload_destination(
        &self,
        session: &Session,
    ) -> Result<UploadDestination, PhotoApiError>;

    /// Send a multipart payload to the upload server.
    async fn upload_binary(
        &self,
        destination: &UploadDestination,
        payload: Payload,
    ) -> Result<UploadReceipt, PhotoApiError>;

    /// Save uploaded photos into the album, returning how many were saved.
    async fn commit_upload(
        &self,
        session: &Session,
        receipt: &UploadReceipt,
        caption: Option<&str>,
    ) -> Result<usize, PhotoApiError>;
}
