//! TOML configuration file loading
//!
//! Supports `~/.config/plugboard/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct PlugboardConfigFile {
    /// Base system prompt file
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Plugin discovery and launch
    #[serde(default)]
    pub plugins: PluginsFileConfig,

    /// Request dispatch
    #[serde(default)]
    pub dispatch: DispatchFileConfig,

    /// Readiness probing after launch
    #[serde(default)]
    pub readiness: ReadinessFileConfig,
}

/// Plugin discovery and launch configuration
#[derive(Debug, Default, Deserialize)]
pub struct PluginsFileConfig {
    /// Directory scanned for plugins
    pub dir: Option<String>,

    /// Entry point file name inside each plugin directory
    pub entry_file: Option<String>,

    /// First port handed to launched plugins
    pub base_port: Option<u16>,

    /// Python interpreter for `.py` entry points
    pub python: Option<String>,

    /// Plugin name to externally supplied host
    #[serde(default)]
    pub hosts: HashMap<String, String>,
}

/// Dispatch configuration
#[derive(Debug, Default, Deserialize)]
pub struct DispatchFileConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Readiness check configuration
#[derive(Debug, Default, Deserialize)]
pub struct ReadinessFileConfig {
    /// Whether to poll at all
    pub enabled: Option<bool>,
    /// Maximum number of polls
    pub attempts: Option<u32>,
    /// Delay between polls in milliseconds
    pub interval_ms: Option<u64>,
}

/// Load the TOML config file from `path`, or the standard path when `None`
///
/// Returns `PlugboardConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file(path: Option<&Path>) -> PlugboardConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return PlugboardConfigFile::default();
    };

    if !path.exists() {
        return PlugboardConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                PlugboardConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            PlugboardConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/plugboard/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("plugboard").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
system_prompt = "prompt.txt"

[plugins]
dir = "/srv/plugins"
base_port = 40000
python = "python3.11"

[plugins.hosts]
todo = "http://todo.internal:8080/"

[dispatch]
timeout_secs = 5

[readiness]
attempts = 3
interval_ms = 100
"#,
        )
        .unwrap();

        let fc = load_config_file(Some(&path));
        assert_eq!(fc.system_prompt.as_deref(), Some("prompt.txt"));
        assert_eq!(fc.plugins.dir.as_deref(), Some("/srv/plugins"));
        assert_eq!(fc.plugins.base_port, Some(40000));
        assert_eq!(fc.plugins.hosts["todo"], "http://todo.internal:8080/");
        assert_eq!(fc.dispatch.timeout_secs, Some(5));
        assert_eq!(fc.readiness.attempts, Some(3));
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "plugins = [not toml").unwrap();

        let fc = load_config_file(Some(&path));
        assert!(fc.plugins.dir.is_none());
    }

    #[test]
    fn missing_file_is_default() {
        let fc = load_config_file(Some(Path::new("/nonexistent/config.toml")));
        assert!(fc.plugins.hosts.is_empty());
    }
}
