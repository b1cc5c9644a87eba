use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use jobwatch_core::backoff::Backoff;
use jobwatch_core::policy::PolicyConfig;
use jobwatch_core::status::DEFAULT_BUILDING_SUFFIX;
use serde::{Deserialize, Serialize};

use crate::jenkins::Credentials;

/// Upper bound for every duration setting, in seconds (one day).
pub const MAX_DURATION_SECS: u64 = 24 * 60 * 60;

/// Every watcher setting. Loaded from TOML, then overridden by flags.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub username: Option<String>,
    pub api_token: Option<String>,

    pub poll_interval_secs: u64,
    pub backoff_factor: f64,
    pub backoff_ceiling_secs: u64,
    pub fetch_timeout_secs: u64,

    pub flicker_window_secs: u64,
    pub building_suffix: String,
    pub notify_building_changes: bool,
    pub notify_appeared: bool,

    pub history_path: PathBuf,
    pub webhook_url: Option<String>,
    /// Where to dump the last snapshot on shutdown.
    pub snapshot_out: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            username: None,
            api_token: None,
            poll_interval_secs: 60,
            backoff_factor: 2.0,
            backoff_ceiling_secs: 15 * 60,
            fetch_timeout_secs: 15,
            flicker_window_secs: 30,
            building_suffix: DEFAULT_BUILDING_SUFFIX.to_string(),
            notify_building_changes: false,
            notify_appeared: true,
            history_path: PathBuf::from(".jobwatch/history.jsonl"),
            webhook_url: None,
            snapshot_out: None,
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: Config = toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("base_url must be an http(s) URL, got {:?}", self.base_url);
        }
        if self.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be positive");
        }
        if self.fetch_timeout_secs == 0 {
            bail!("fetch_timeout_secs must be positive");
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            bail!("backoff_factor must be >= 1, got {}", self.backoff_factor);
        }
        if self.backoff_ceiling_secs < self.poll_interval_secs {
            bail!(
                "backoff_ceiling_secs ({}) must be >= poll_interval_secs ({})",
                self.backoff_ceiling_secs,
                self.poll_interval_secs
            );
        }
        for (key, secs) in [
            ("poll_interval_secs", self.poll_interval_secs),
            ("backoff_ceiling_secs", self.backoff_ceiling_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("flicker_window_secs", self.flicker_window_secs),
        ] {
            if secs > MAX_DURATION_SECS {
                bail!("{key} must be at most {MAX_DURATION_SECS}, got {secs}");
            }
        }
        if self.username.is_some() != self.api_token.is_some() {
            bail!("username and api_token must be set together");
        }
        Ok(())
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            base: Duration::from_secs(self.poll_interval_secs),
            factor: self.backoff_factor,
            ceiling: Duration::from_secs(self.backoff_ceiling_secs),
        }
    }

    pub fn policy(&self) -> PolicyConfig {
        PolicyConfig {
            flicker_window_ms: i64::try_from(self.flicker_window_secs)
                .map_or(i64::MAX, |secs| secs.saturating_mul(1_000)),
            notify_building_changes: self.notify_building_changes,
            notify_appeared: self.notify_appeared,
        }
    }

    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.username, &self.api_token) {
            (Some(username), Some(api_token)) => Some(Credentials {
                username: username.clone(),
                api_token: api_token.clone(),
            }),
            _ => None,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Command-line flags. Unset flags fall back to the config file, then defaults.
#[derive(Parser, Debug)]
#[command(name = "jobwatch", version, about = "Watches a Jenkins job list and notifies on build state changes")]
pub struct Args {
    /// TOML config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Jenkins base URL, e.g. http://ci.example.com:8080
    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long)]
    pub username: Option<String>,

    /// Jenkins API token (used with --username for basic auth).
    #[arg(long)]
    pub api_token: Option<String>,

    /// Seconds between poll starts.
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    #[arg(long)]
    pub backoff_factor: Option<f64>,

    #[arg(long)]
    pub backoff_ceiling_secs: Option<u64>,

    #[arg(long)]
    pub fetch_timeout_secs: Option<u64>,

    /// Minimum seconds between two alerts for the same job.
    #[arg(long)]
    pub flicker_window_secs: Option<u64>,

    /// Status suffix that marks a running build.
    #[arg(long)]
    pub building_suffix: Option<String>,

    #[arg(long)]
    pub notify_building_changes: Option<bool>,

    #[arg(long)]
    pub notify_appeared: Option<bool>,

    #[arg(long)]
    pub history_path: Option<PathBuf>,

    /// POST each notification as JSON to this URL.
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// Write the last snapshot here on shutdown.
    #[arg(long)]
    pub snapshot_out: Option<PathBuf>,

    /// Run a single poll cycle, then exit.
    #[arg(long)]
    pub once: bool,

    /// Log level (env-filter syntax).
    #[arg(long, default_value = "info")]
    pub log: String,
}

impl Args {
    /// File (if any) -> flag overrides -> validation.
    pub fn resolve(&self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::default(),
        };

        if let Some(v) = &self.base_url {
            cfg.base_url = v.clone();
        }
        if let Some(v) = self.poll_interval_secs {
            cfg.poll_interval_secs = v;
        }
        if let Some(v) = self.backoff_factor {
            cfg.backoff_factor = v;
        }
        if let Some(v) = self.backoff_ceiling_secs {
            cfg.backoff_ceiling_secs = v;
        }
        if let Some(v) = self.fetch_timeout_secs {
            cfg.fetch_timeout_secs = v;
        }
        if let Some(v) = self.flicker_window_secs {
            cfg.flicker_window_secs = v;
        }
        if let Some(v) = &self.building_suffix {
            cfg.building_suffix = v.clone();
        }
        if let Some(v) = self.notify_building_changes {
            cfg.notify_building_changes = v;
        }
        if let Some(v) = self.notify_appeared {
            cfg.notify_appeared = v;
        }
        if let Some(v) = &self.history_path {
            cfg.history_path = v.clone();
        }
        if self.username.is_some() {
            cfg.username = self.username.clone();
        }
        if self.api_token.is_some() {
            cfg.api_token = self.api_token.clone();
        }
        if self.webhook_url.is_some() {
            cfg.webhook_url = self.webhook_url.clone();
        }
        if self.snapshot_out.is_some() {
            cfg.snapshot_out = self.snapshot_out.clone();
        }

        cfg.validate()?;
        Ok(cfg)
    }
}
