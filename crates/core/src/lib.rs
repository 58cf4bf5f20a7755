pub mod config;
pub mod media;
pub mod metrics;
pub mod payload;
pub mod photo_api;
pub mod scheduler;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, ApiConfig, Config, ConfigError,
    Credentials, MediaConfig, SanitizedConfig,
};
pub use media::{load_media_pool, MediaError, MediaPool, Picture};
pub use payload::{Payload, PayloadBuilder, PayloadError, PayloadPart};
pub use photo_api::{
    PhotoApiError, PhotoService, Session, UploadDestination, UploadReceipt, VkClient,
};
pub use scheduler::{
    Outcome, OutcomeStatus, RunSummary, SchedulerConfig, SchedulerError, Stage, UploadScheduler,
};
