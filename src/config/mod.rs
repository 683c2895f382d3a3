//! Fleet configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the YAML file,
//! environment variables, then CLI flags (applied by the CLI layer).
//!
//! ```yaml
//! workers:
//!   - 4e8e5ce1-fcb0-4e6b-963f-57492bfe99f1
//!   - 60165e37-5c18-41fb-aa49-ebe3a69b5f5c
//! session: webarena
//! launch_delay_secs: 2
//! driver:
//!   program: python
//!   script: gbox_run.py
//!   provider: bedrock
//! endpoints:
//!   host: http://ec2-3-149-78-74.us-east-2.compute.amazonaws.com
//! ```

pub mod endpoints;

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub use endpoints::{render_exports, Endpoint, EndpointConfig, Site};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "fleet.yaml";

/// Default tmux session holding one window per worker.
pub const DEFAULT_SESSION: &str = "webarena";

/// Default pause between successive worker launches.
pub const DEFAULT_LAUNCH_DELAY_SECS: u64 = 2;

/// Model provider the driver talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Direct Anthropic API.
    Anthropic,
    /// AWS Bedrock.
    #[default]
    Bedrock,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::Bedrock => "bedrock",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" => Ok(Provider::Anthropic),
            "bedrock" => Ok(Provider::Bedrock),
            other => Err(ConfigError::InvalidValue {
                key: "provider".to_string(),
                message: format!("unknown provider '{}' (expected anthropic or bedrock)", other),
            }),
        }
    }
}

/// How to launch the external benchmark driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Interpreter or executable.
    pub program: String,
    /// Script passed as the first argument, if any.
    pub script: Option<String>,
    pub provider: Provider,
    /// Directory each window changes into before running the driver.
    pub working_dir: Option<PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            script: Some("gbox_run.py".to_string()),
            provider: Provider::default(),
            working_dir: None,
        }
    }
}

/// Everything the dispatcher needs besides the range and result directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Ordered worker identifiers (GBOX box IDs).
    pub workers: Vec<String>,
    pub session: String,
    pub launch_delay_secs: u64,
    pub driver: DriverConfig,
    pub endpoints: EndpointConfig,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            workers: Vec::new(),
            session: DEFAULT_SESSION.to_string(),
            launch_delay_secs: DEFAULT_LAUNCH_DELAY_SECS,
            driver: DriverConfig::default(),
            endpoints: EndpointConfig::default(),
        }
    }
}

impl FleetConfig {
    /// Loads configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when it
    /// exists, then applies environment overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
                    Self::default()
                }
            }
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Parses a YAML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        debug!(path = %path.display(), workers = config.workers.len(), "Loaded fleet config");
        Ok(config)
    }

    /// Applies overrides from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `FLEET_WORKERS`: comma-separated worker IDs (replaces the list)
    /// - `FLEET_SESSION`: tmux session name
    /// - `FLEET_LAUNCH_DELAY_SECS`: seconds between launches
    /// - `FLEET_PROVIDER`: `anthropic` or `bedrock`
    /// - `WEBARENA_HOST`: deployment host for all benchmark sites
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`FleetConfig::apply_env`] with an injectable lookup.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("FLEET_WORKERS") {
            self.workers = parse_worker_list(&raw);
        }
        if let Some(session) = lookup("FLEET_SESSION") {
            self.session = session;
        }
        if let Some(raw) = lookup("FLEET_LAUNCH_DELAY_SECS") {
            self.launch_delay_secs =
                raw.trim()
                    .parse()
                    .map_err(|e| ConfigError::InvalidValue {
                        key: "FLEET_LAUNCH_DELAY_SECS".to_string(),
                        message: format!("{}", e),
                    })?;
        }
        if let Some(raw) = lookup("FLEET_PROVIDER") {
            self.driver.provider = raw.parse()?;
        }
        if let Some(host) = lookup("WEBARENA_HOST") {
            self.endpoints.host = Some(host);
        }
        Ok(())
    }

    /// Checks the invariants dispatch relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers.is_empty() {
            return Err(ConfigError::ValidationFailed(format!(
                "no workers configured (set `workers` in {} or FLEET_WORKERS)",
                DEFAULT_CONFIG_FILE
            )));
        }

        let mut seen = HashSet::new();
        for worker in &self.workers {
            if worker.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "worker IDs must not be blank".to_string(),
                ));
            }
            if !seen.insert(worker.as_str()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "duplicate worker ID '{}'",
                    worker
                )));
            }
        }

        validate_session_name(&self.session)?;

        if self.driver.program.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "driver program must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn launch_delay(&self) -> Duration {
        Duration::from_secs(self.launch_delay_secs)
    }
}

/// tmux uses `:` and `.` as target separators.
pub fn validate_session_name(name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "session".to_string(),
            message: "session name must not be empty".to_string(),
        });
    }
    if name.contains(':') || name.contains('.') {
        return Err(ConfigError::InvalidValue {
            key: "session".to_string(),
            message: format!("session name '{}' must not contain ':' or '.'", name),
        });
    }
    Ok(())
}

/// Splits a comma-separated worker list, dropping blanks.
pub fn parse_worker_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}
