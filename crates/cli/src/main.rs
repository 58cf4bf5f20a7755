mod args;
mod metrics;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use floret_core::{
    load_config, load_media_pool, validate_config, Config, ConfigError, PhotoService,
    SanitizedConfig, UploadScheduler, VkClient,
};

use args::Args;

const BANNER: &str = r"
      ________                __
     / ____/ /___  ________  / /_
    / /_  / / __ \/ ___/ _ \/ __/
   / __/ / / /_/ / /  /  __/ /_
  /_/   /_/\____/_/   \___/\__/
";

/// Exit status for setup failures and fatal remote errors.
const EXIT_FATAL: i32 = 2;

/// Exit status for `--strict` runs with at least one failed attempt.
const EXIT_PARTIAL: i32 = 1;

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}

async fn run() -> Result<i32> {
    let args = Args::parse();

    println!("{}", BANNER);

    // Initialize logging
    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    debug!("Loading configuration from {:?}", args.config);
    let mut config = match load_config(&args.config) {
        Ok(config) => config,
        Err(ConfigError::FileNotFound(path)) => {
            warn!("Config file {} not found, using flags and defaults", path);
            Config::default()
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to load config from {:?}", args.config))
        }
    };
    args.apply(&mut config);

    validate_config(&config).context("Configuration validation failed")?;
    if let Ok(json) = serde_json::to_string(&SanitizedConfig::from(&config)) {
        debug!("Effective configuration: {}", json);
    }

    // Load pictures and captions
    let captions_file = config
        .scheduler
        .attach_captions
        .then_some(config.media.captions_file.as_path());
    let pool = load_media_pool(&config.media.pictures_dir, captions_file)
        .await
        .with_context(|| {
            format!(
                "Failed to load media from {:?}",
                config.media.pictures_dir
            )
        })?;
    info!(
        "Media pool ready: {} pictures ({} bytes), {} captions",
        pool.pictures().len(),
        pool.total_bytes(),
        pool.captions().len()
    );

    let service: Arc<dyn PhotoService> =
        Arc::new(VkClient::new(config.api.clone()).context("Failed to create API client")?);
    info!("Using photo service: {}", service.name());

    let scheduler = UploadScheduler::new(
        service,
        config.session(),
        Arc::new(pool),
        config.scheduler.clone(),
    );
    let summary = scheduler.run().await.context("Upload run aborted")?;

    info!(
        "Run {} done: {} attempts, {} succeeded, {} failed in {}s",
        summary.run_id,
        summary.attempts(),
        summary.succeeded(),
        summary.failed(),
        (summary.finished_at - summary.started_at).num_seconds()
    );

    if args.metrics {
        print!("{}", metrics::encode_metrics());
    }

    if scheduler.config().strict && !summary.all_succeeded() {
        return Ok(EXIT_PARTIAL);
    }
    Ok(0)
}
