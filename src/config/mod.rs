//! Configuration management for plugboard

pub mod file;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::dispatch::DEFAULT_TIMEOUT;
use crate::plugins::ReadinessPolicy;
use crate::plugins::discovery::DEFAULT_ENTRY_FILE;
use crate::plugins::supervisor::{DEFAULT_BASE_PORT, default_python};
use crate::prompt::DEFAULT_PROMPT_FILE;
use crate::{Error, Result};

use file::PlugboardConfigFile;

/// plugboard configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Plugin discovery and launch
    pub plugins: PluginsConfig,

    /// Per-request dispatch timeout
    pub dispatch_timeout: Duration,

    /// Readiness check applied after each launch
    pub readiness: ReadinessPolicy,

    /// Base system prompt file
    pub system_prompt_path: PathBuf,
}

/// Plugin discovery and launch configuration
#[derive(Debug, Clone)]
pub struct PluginsConfig {
    /// Directory scanned for plugins
    pub dir: PathBuf,

    /// Entry point file name inside each plugin directory
    pub entry_file: String,

    /// First port handed to launched plugins
    pub base_port: u16,

    /// Python interpreter for `.py` entry points
    pub python: String,

    /// Plugins served on an externally supplied host instead of a local port
    pub hosts: HashMap<String, String>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("plugins"),
            entry_file: DEFAULT_ENTRY_FILE.to_string(),
            base_port: DEFAULT_BASE_PORT,
            python: default_python(),
            hosts: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if an environment variable holds an invalid value
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let fc = file::load_config_file(config_path);
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if an environment variable holds an invalid value
    pub fn from_sources(
        fc: PlugboardConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let defaults = PluginsConfig::default();

        let plugins = PluginsConfig {
            dir: env("PLUGBOARD_PLUGINS_DIR")
                .or(fc.plugins.dir)
                .map_or(defaults.dir, PathBuf::from),
            entry_file: fc.plugins.entry_file.unwrap_or(defaults.entry_file),
            base_port: env_parse(&env, "PLUGBOARD_BASE_PORT")?
                .or(fc.plugins.base_port)
                .unwrap_or(defaults.base_port),
            python: env("PLUGBOARD_PYTHON")
                .or(fc.plugins.python)
                .unwrap_or(defaults.python),
            hosts: fc.plugins.hosts,
        };

        let dispatch_timeout = env_parse(&env, "PLUGBOARD_TIMEOUT_SECS")?
            .or(fc.dispatch.timeout_secs)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        let wait_ready = match env("PLUGBOARD_WAIT_READY") {
            Some(value) => parse_bool(&value).map_err(|e| {
                Error::Config(format!("PLUGBOARD_WAIT_READY: {e}"))
            })?,
            None => fc.readiness.enabled.unwrap_or(true),
        };
        let readiness = if wait_ready {
            let default = ReadinessPolicy::default();
            ReadinessPolicy {
                attempts: env_parse(&env, "PLUGBOARD_READY_ATTEMPTS")?
                    .or(fc.readiness.attempts)
                    .unwrap_or(default.attempts),
                interval: fc
                    .readiness
                    .interval_ms
                    .map_or(default.interval, Duration::from_millis),
            }
        } else {
            ReadinessPolicy::disabled()
        };

        let system_prompt_path = env("PLUGBOARD_SYSTEM_PROMPT")
            .or(fc.system_prompt)
            .map_or_else(|| PathBuf::from(DEFAULT_PROMPT_FILE), PathBuf::from);

        Ok(Self {
            plugins,
            dispatch_timeout,
            readiness,
            system_prompt_path,
        })
    }
}

/// Parse an optional environment variable
fn env_parse<T>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|e| Error::Config(format!("{key}={value}: {e}")))
        })
        .transpose()
}

/// Parse a human-friendly boolean (`true/yes/y/on/1`, `false/no/n/off/0`)
///
/// # Errors
///
/// Returns `Error::Config` for anything else
pub fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "y" | "on" | "1" => Ok(true),
        "false" | "no" | "n" | "off" | "0" => Ok(false),
        other => Err(Error::Config(format!(
            "not a boolean value (true/false, 1/0, etc.): {other}"
        ))),
    }
}
