//! Command line flags.

use std::path::PathBuf;

use clap::Parser;
use floret_core::Config;

/// Default config file location.
pub const DEFAULT_CONFIG_PATH: &str = "./res/config.json";

/// Uploads random pictures from a local folder into a community photo album.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Verbose (debug-level) logs.
    #[arg(short, long)]
    pub verbose: bool,

    /// Do not attach captions.
    #[arg(long = "no-caps")]
    pub no_caps: bool,

    /// Access token (overrides the config file).
    #[arg(long)]
    pub token: Option<String>,

    /// Album id (overrides the config file).
    #[arg(long)]
    pub aid: Option<String>,

    /// Group id (overrides the config file).
    #[arg(long)]
    pub gid: Option<String>,

    /// Config file.
    #[arg(long = "conf", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Pictures directory.
    #[arg(long = "pics")]
    pub pictures_dir: Option<PathBuf>,

    /// Captions file.
    #[arg(long = "caps")]
    pub captions_file: Option<PathBuf>,

    /// Workers per iteration.
    #[arg(long = "th")]
    pub threads: Option<usize>,

    /// Number of iterations.
    #[arg(short = 'i', long = "iters")]
    pub iterations: Option<usize>,

    /// Pause between iterations, in seconds.
    #[arg(short = 't', long = "timeout")]
    pub cooldown_secs: Option<u64>,

    /// Send one throwaway upload before the first iteration.
    #[arg(long)]
    pub trial: bool,

    /// Exit with status 1 if any upload attempt failed.
    #[arg(long)]
    pub strict: bool,

    /// Print Prometheus metrics when the run ends.
    #[arg(long)]
    pub metrics: bool,
}

impl Args {
    /// Apply flags on top of a loaded config. Flags that were not given keep
    /// the config value.
    pub fn apply(&self, config: &mut Config) {
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());

        if let Some(token) = non_empty(&self.token) {
            config.credentials.token = token;
        }
        if let Some(gid) = non_empty(&self.gid) {
            config.credentials.group_id = gid;
        }
        if let Some(aid) = non_empty(&self.aid) {
            config.credentials.album_id = aid;
        }
        if let Some(dir) = &self.pictures_dir {
            config.media.pictures_dir = dir.clone();
        }
        if let Some(file) = &self.captions_file {
            config.media.captions_file = file.clone();
        }
        if let Some(threads) = self.threads {
            config.scheduler.threads = threads;
        }
        if let Some(iterations) = self.iterations {
            config.scheduler.iterations = iterations;
        }
        if let Some(cooldown) = self.cooldown_secs {
            config.scheduler.cooldown_secs = cooldown;
        }
        if self.no_caps {
            config.scheduler.attach_captions = false;
        }
        if self.trial {
            config.scheduler.trial_upload = true;
        }
        if self.strict {
            config.scheduler.strict = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["floret"]);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!args.verbose);
        assert!(args.threads.is_none());

        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.scheduler.threads, 1);
        assert!(config.scheduler.attach_captions);
    }

    #[test]
    fn test_short_and_long_flags() {
        let args = Args::parse_from([
            "floret", "-v", "--no-caps", "--th", "8", "-i", "3", "-t", "15", "--gid", "42",
            "--aid", "7", "--token", "tok", "--pics", "/tmp/pics", "--strict",
        ]);

        let mut config = Config::default();
        args.apply(&mut config);
        assert!(args.verbose);
        assert_eq!(config.scheduler.threads, 8);
        assert_eq!(config.scheduler.iterations, 3);
        assert_eq!(config.scheduler.cooldown_secs, 15);
        assert!(!config.scheduler.attach_captions);
        assert!(config.scheduler.strict);
        assert!(!config.scheduler.trial_upload);
        assert_eq!(config.credentials.token, "tok");
        assert_eq!(config.credentials.group_id, "42");
        assert_eq!(config.credentials.album_id, "7");
        assert_eq!(config.media.pictures_dir, PathBuf::from("/tmp/pics"));
    }

    #[test]
    fn test_empty_flag_keeps_config_value() {
        let args = Args::parse_from(["floret", "--token", ""]);
        let mut config = Config::default();
        config.credentials.token = "from-file".to_string();

        args.apply(&mut config);
        assert_eq!(config.credentials.token, "from-file");
    }
}
