//! Plugin manifest format (`.well-known/ai-plugin.json`)
//!
//! The manifest identifies a plugin to the outside world. The registry only
//! reads it for display; dispatch never depends on it.

use std::path::Path;

use serde::Deserialize;

/// Plugin manifest describing a plugin's public identity
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    /// Manifest schema version (e.g. "v1")
    #[serde(default)]
    pub schema_version: Option<String>,
    /// Name shown to humans
    #[serde(default)]
    pub name_for_human: Option<String>,
    /// Name shown to the model
    #[serde(default)]
    pub name_for_model: Option<String>,
    /// Description shown to humans
    #[serde(default)]
    pub description_for_human: Option<String>,
    /// Description shown to the model
    #[serde(default)]
    pub description_for_model: Option<String>,
    /// API descriptor
    #[serde(default)]
    pub api: Option<ManifestApi>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub legal_info_url: Option<String>,
}

/// Where the plugin's API description lives
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestApi {
    /// API description kind (e.g. "openapi")
    #[serde(rename = "type")]
    pub kind: String,
    /// URL of the API description
    pub url: String,
}

impl PluginManifest {
    /// Best display name, falling back to `fallback`
    #[must_use]
    pub fn display_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.name_for_human
            .as_deref()
            .or(self.name_for_model.as_deref())
            .unwrap_or(fallback)
    }
}

/// Load and parse a manifest file
///
/// Returns `None` if the file is missing or malformed; a bad manifest never
/// prevents a plugin from loading.
#[must_use]
pub fn load_manifest(path: &Path) -> Option<PluginManifest> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<PluginManifest>(&content) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to parse plugin manifest"
            );
            None
        }
    }
}
