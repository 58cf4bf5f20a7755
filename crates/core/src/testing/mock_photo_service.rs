//! Mock photo service for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::payload::Payload;
use crate::photo_api::{
    PhotoApiError, PhotoService, Session, UploadDestination, UploadReceipt,
};

/// A recorded upload for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    /// Destination the payload was sent to.
    pub destination: UploadDestination,
    /// The payload that was sent.
    pub payload: Payload,
    /// When the upload started.
    pub timestamp: DateTime<Utc>,
}

/// A recorded commit for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCommit {
    pub receipt: UploadReceipt,
    pub caption: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Mock implementation of the PhotoService trait.
///
/// Provides controllable behavior for testing:
/// - Record uploads and commits for assertions
/// - Fail validation, destination lookup or individual calls
/// - Delay uploads and track how many run at once
///
/// Uploads and commits are numbered from 0 in call order. Each upload
/// returns a distinct receipt, and a commit reports as many saved photos
/// as the matching upload carried.
///
/// # Example
///
/// ```rust,ignore
/// let service = Arc::new(MockPhotoService::new());
/// service.fail_upload_call(1, PhotoApiError::Timeout).await;
///
/// let summary = UploadScheduler::new(service.clone(), session, pool, config)
///     .run()
///     .await?;
///
/// assert_eq!(service.upload_count().await, 3);
/// assert_eq!(summary.failed(), 1);
/// ```
pub struct MockPhotoService {
    /// Destination handed out by `upload_destination`.
    destination: Arc<RwLock<UploadDestination>>,
    /// If set, `validate` fails with this error.
    validate_error: Arc<RwLock<Option<PhotoApiError>>>,
    /// If set, `upload_destination` fails with this error.
    destination_error: Arc<RwLock<Option<PhotoApiError>>>,
    /// Upload failures by call index.
    upload_failures: Arc<RwLock<HashMap<usize, PhotoApiError>>>,
    /// Commit failures by call index.
    commit_failures: Arc<RwLock<HashMap<usize, PhotoApiError>>>,
    /// Simulated transfer time for each upload.
    upload_delay: Arc<RwLock<Duration>>,
    validate_calls: AtomicUsize,
    destination_calls: AtomicUsize,
    upload_calls: AtomicUsize,
    commit_calls: AtomicUsize,
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    commits: Arc<RwLock<Vec<RecordedCommit>>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl std::fmt::Debug for MockPhotoService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPhotoService")
            .field("destination", &"<destination>")
            .field("upload_calls", &self.upload_calls.load(Ordering::SeqCst))
            .field("commit_calls", &self.commit_calls.load(Ordering::SeqCst))
            .field("max_in_flight", &self.max_in_flight.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for MockPhotoService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPhotoService {
    /// Create a mock service that accepts everything.
    pub fn new() -> Self {
        Self::with_destination("https://pu.mock.local/upload.php?act=do_add")
    }

    /// Create a mock service that hands out the given upload URL.
    ///
    /// An empty URL makes `upload_destination` fail the way a real backend
    /// would when the response carries no usable URL.
    pub fn with_destination(url: impl Into<String>) -> Self {
        Self {
            destination: Arc::new(RwLock::new(UploadDestination::new(url))),
            validate_error: Arc::new(RwLock::new(None)),
            destination_error: Arc::new(RwLock::new(None)),
            upload_failures: Arc::new(RwLock::new(HashMap::new())),
            commit_failures: Arc::new(RwLock::new(HashMap::new())),
            upload_delay: Arc::new(RwLock::new(Duration::ZERO)),
            validate_calls: AtomicUsize::new(0),
            destination_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            commit_calls: AtomicUsize::new(0),
            uploads: Arc::new(RwLock::new(Vec::new())),
            commits: Arc::new(RwLock::new(Vec::new())),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Change the upload URL returned by subsequent `upload_destination` calls.
    pub async fn set_destination(&self, url: impl Into<String>) {
        *self.destination.write().await = UploadDestination::new(url);
    }

    /// Make `validate` fail with the given error.
    pub async fn set_validate_error(&self, error: PhotoApiError) {
        *self.validate_error.write().await = Some(error);
    }

    /// Make `upload_destination` fail with the given error.
    pub async fn set_destination_error(&self, error: PhotoApiError) {
        *self.destination_error.write().await = Some(error);
    }

    /// Fail the upload with the given call index (0-based).
    pub async fn fail_upload_call(&self, index: usize, error: PhotoApiError) {
        self.upload_failures.write().await.insert(index, error);
    }

    /// Fail the commit with the given call index (0-based).
    pub async fn fail_commit_call(&self, index: usize, error: PhotoApiError) {
        self.commit_failures.write().await.insert(index, error);
    }

    /// Hold every upload for the given duration.
    pub async fn set_upload_delay(&self, delay: Duration) {
        *self.upload_delay.write().await = delay;
    }

    /// Get recorded uploads, in call order.
    pub async fn recorded_uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }

    /// Get recorded commits, in call order.
    pub async fn recorded_commits(&self) -> Vec<RecordedCommit> {
        self.commits.read().await.clone()
    }

    pub async fn validate_count(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub async fn destination_count(&self) -> usize {
        self.destination_calls.load(Ordering::SeqCst)
    }

    pub async fn upload_count(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub async fn commit_count(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    /// Highest number of uploads observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter_upload(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave_upload(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl PhotoService for MockPhotoService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn validate(&self, _session: &Session) -> Result<(), PhotoApiError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        match self.validate_error.read().await.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn upload_destination(
        &self,
        _session: &Session,
    ) -> Result<UploadDestination, PhotoApiError> {
        self.destination_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.destination_error.read().await.clone() {
            return Err(error);
        }

        let destination = self.destination.read().await.clone();
        if destination.as_str().is_empty() {
            return Err(PhotoApiError::UnexpectedResponse(
                "empty upload_url".to_string(),
            ));
        }
        Ok(destination)
    }

    async fn upload_binary(
        &self,
        destination: &UploadDestination,
        payload: Payload,
    ) -> Result<UploadReceipt, PhotoApiError> {
        let index = self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let parts = payload.len();
        self.uploads.write().await.push(RecordedUpload {
            destination: destination.clone(),
            payload,
            timestamp: Utc::now(),
        });

        self.enter_upload();
        let delay = *self.upload_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.leave_upload();

        if let Some(error) = self.upload_failures.read().await.get(&index).cloned() {
            return Err(error);
        }

        Ok(UploadReceipt {
            server: 100 + index as i64,
            photos_list: format!("[{{\"upload\":{},\"parts\":{}}}]", index, parts),
            hash: format!("mockhash{:08x}", index),
            aid: None,
        })
    }

    async fn commit_upload(
        &self,
        _session: &Session,
        receipt: &UploadReceipt,
        caption: Option<&str>,
    ) -> Result<usize, PhotoApiError> {
        let index = self.commit_calls.fetch_add(1, Ordering::SeqCst);
        self.commits.write().await.push(RecordedCommit {
            receipt: receipt.clone(),
            caption: caption.map(str::to_string),
            timestamp: Utc::now(),
        });

        if let Some(error) = self.commit_failures.read().await.get(&index).cloned() {
            return Err(error);
        }

        let upload = (receipt.server - 100) as usize;
        let saved = self
            .uploads
            .read()
            .await
            .get(upload)
            .map(|u| u.payload.len())
            .unwrap_or(0);
        Ok(saved)
    }
}
