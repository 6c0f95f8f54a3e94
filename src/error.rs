//! Error types for plugboard

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for plugboard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or dispatching to plugins
#[derive(Debug, Error)]
pub enum Error {
    /// Plugin could not be launched (missing entry point, spawn failure)
    #[error("failed to launch plugin {plugin}: {reason}")]
    Launch { plugin: String, reason: String },

    /// Plugin specification document is unreadable or malformed
    #[error("invalid plugin spec {}: {reason}", path.display())]
    SpecFormat { path: PathBuf, reason: String },

    /// Request names a plugin that is not registered
    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),

    /// Request names an operation the plugin does not declare
    #[error("unknown operation {operation} for plugin {plugin}")]
    UnknownOperation { plugin: String, operation: String },

    /// Path template references a parameter the request did not supply
    #[error("missing parameter {name} for path {path}")]
    MissingParameter { path: String, name: String },

    /// Inline parameter token is not of the form `key=value`
    #[error("malformed parameter {0:?}, expected key=value")]
    ParamFormat(String),

    /// Plugin is unreachable or did not answer in time
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Registry listing could not be rendered as YAML
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether the agent can fix this failure by correcting its request
    #[must_use]
    pub const fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownPlugin(_)
                | Self::UnknownOperation { .. }
                | Self::MissingParameter { .. }
                | Self::ParamFormat(_)
        )
    }
}
