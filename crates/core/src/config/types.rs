use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::photo_api::Session;
use crate::scheduler::SchedulerConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Build the immutable session used for every remote call of a run.
    pub fn session(&self) -> Session {
        Session::new(
            &self.credentials.token,
            &self.credentials.group_id,
            &self.credentials.album_id,
            &self.api.version,
        )
    }
}

/// Access credentials for the photo service.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Credentials {
    /// User or community access token.
    #[serde(default, alias = "Token")]
    pub token: String,
    /// Community (group) identifier, without the leading minus.
    #[serde(default)]
    pub group_id: String,
    /// Target album identifier.
    #[serde(default)]
    pub album_id: String,
}

impl Credentials {
    /// Fill empty fields from another credentials set, keeping the ones already present.
    pub fn fill_missing(&mut self, other: Credentials) {
        if self.token.is_empty() {
            self.token = other.token;
        }
        if self.group_id.is_empty() {
            self.group_id = other.group_id;
        }
        if self.album_id.is_empty() {
            self.album_id = other.album_id;
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.token.is_empty() && !self.group_id.is_empty() && !self.album_id.is_empty()
    }
}

/// Remote method API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Method endpoint base (e.g., "https://api.vk.com/method/")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// API protocol version sent as `v` with every call
    #[serde(default = "default_api_version")]
    pub version: String,
    /// Request timeout in seconds (default: 60)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            version: default_api_version(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.vk.com/method/".to_string()
}

fn default_api_version() -> String {
    "5.131".to_string()
}

fn default_timeout() -> u32 {
    60
}

/// Where pictures and captions are read from
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    #[serde(default = "default_pictures_dir")]
    pub pictures_dir: PathBuf,
    #[serde(default = "default_captions_file")]
    pub captions_file: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            pictures_dir: default_pictures_dir(),
            captions_file: default_captions_file(),
        }
    }
}

fn default_pictures_dir() -> PathBuf {
    PathBuf::from("./res/pics/")
}

fn default_captions_file() -> PathBuf {
    PathBuf::from("./res/captions.conf")
}

/// Sanitized config for logging (token redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub token_configured: bool,
    pub group_id: String,
    pub album_id: String,
    pub api: ApiConfig,
    pub media: MediaConfig,
    pub scheduler: SchedulerConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            token_configured: !config.credentials.token.is_empty(),
            group_id: config.credentials.group_id.clone(),
            album_id: config.credentials.album_id.clone(),
            api: config.api.clone(),
            media: config.media.clone(),
            scheduler: config.scheduler.clone(),
        }
    }
}
