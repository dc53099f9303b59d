//! Planning client configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::channel::get_socket_path;
use crate::protocol::ResolutionMode;
use crate::session::CompletionPolicy;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Connection to the planning service
    pub channel: ChannelConfig,

    /// What to submit and when to stop
    pub planning: PlanningConfig,
}

/// Project-local config file, relative to the working directory
const LOCAL_CONFIG: &str = ".planclient.yml";

impl Config {
    /// Files tried in order when no explicit path is given
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("planclient").join("planclient.yml"));
        }
        paths
    }

    /// Load the explicit file, else the first readable search path, else defaults
    ///
    /// Only an explicit path is allowed to fail the load.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).with_context(|| format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_paths().into_iter().filter(|p| p.is_file()) {
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => warn!(path = %candidate.display(), error = %e, "Config::load: skipping config"),
            }
        }

        debug!("Config::load: no config file, using defaults");
        Ok(Self::default())
    }

    /// Log level from the config file, read before logging is set up
    ///
    /// Any failure here is ignored; the full load reports it later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log_level)
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }
}

/// Planning service connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Unix socket of the planning service
    #[serde(rename = "socket-path")]
    pub socket_path: PathBuf,

    /// How long to wait for the service to appear; 0 waits forever
    #[serde(rename = "wait-timeout-ms")]
    pub wait_timeout_ms: u64,

    /// Delay between discovery probes
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Timeout for a single socket operation
    #[serde(rename = "io-timeout-ms")]
    pub io_timeout_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            socket_path: get_socket_path(),
            wait_timeout_ms: 10_000,
            poll_interval_ms: 250,
            io_timeout_ms: 5_000,
        }
    }
}

impl ChannelConfig {
    pub fn wait_timeout(&self) -> Option<Duration> {
        non_zero_ms(self.wait_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms.max(1))
    }
}

/// Planning goal options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningConfig {
    /// Domain file; the bundled pick-and-place domain when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<PathBuf>,

    /// Problem file; the bundled pick-and-place problem when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<PathBuf>,

    #[serde(rename = "resolution-mode")]
    pub resolution_mode: ResolutionMode,

    /// When to stop consuming feedback
    pub completion: CompletionPolicy,

    /// Overall limit on waiting for a terminal outcome; 0 is unbounded
    #[serde(rename = "plan-timeout-ms")]
    pub plan_timeout_ms: u64,
}

impl PlanningConfig {
    pub fn plan_timeout(&self) -> Option<Duration> {
        non_zero_ms(self.plan_timeout_ms)
    }
}

fn non_zero_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}
