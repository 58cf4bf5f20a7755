use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};
use std::path::Path;

use super::{
    types::{Config, Credentials},
    ConfigError,
};

/// Load configuration from file with environment variable overrides.
///
/// `.json` files are read as JSON, everything else as TOML. A flat
/// `{ "token", "group_id", "album_id" }` document is accepted too and fills
/// whatever the `[credentials]` section and the environment left empty.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let base = if is_json(path) {
        Figment::from(Json::file(path))
    } else {
        Figment::from(Toml::file(path))
    };

    let flat: Credentials = base.extract().unwrap_or_default();

    let mut config: Config = base
        .merge(Env::prefixed("FLORET_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.credentials.fill_missing(flat);

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
