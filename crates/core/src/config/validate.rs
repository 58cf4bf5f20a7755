use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Token, group id and album id are all present
/// - API version is set and the request timeout is not 0
/// - Scheduler runs at least one worker for at least one iteration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let creds = &config.credentials;
    if creds.token.is_empty() {
        return Err(ConfigError::ValidationError(
            "credentials.token is empty".to_string(),
        ));
    }
    if creds.group_id.is_empty() {
        return Err(ConfigError::ValidationError(
            "credentials.group_id is empty".to_string(),
        ));
    }
    if creds.album_id.is_empty() {
        return Err(ConfigError::ValidationError(
            "credentials.album_id is empty".to_string(),
        ));
    }

    if config.api.version.is_empty() {
        return Err(ConfigError::ValidationError(
            "api.version cannot be empty".to_string(),
        ));
    }
    if config.api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "api.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.scheduler.threads == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.threads cannot be 0".to_string(),
        ));
    }
    if config.scheduler.iterations == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.iterations cannot be 0".to_string(),
        ));
    }

    Ok(())
}
