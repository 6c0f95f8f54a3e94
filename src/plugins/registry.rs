//! Plugin registry - the process-wide set of launched plugins

use std::collections::BTreeMap;

use super::discovery::{PluginLayout, discover_plugins};
use super::manifest::{PluginManifest, load_manifest};
use super::spec::{LoadedSpec, OperationIndex, PluginSpec, load_spec};
use super::supervisor::{PluginProcess, Supervisor};
use crate::config::PluginsConfig;
use crate::{Error, Result};

/// Fixed paragraph teaching the agent the request syntax
pub const INTRODUCTION: &str = "Before giving a response to the user, you can interact with several plugins to gather information. Whenever you are unable to answer a question with confidence, you can call a plugin in the format of \"💬PLUGIN_NAME: OPERATION [PARAM=VALUE...]\\nDATA\". Each of my message may contain at most one plugin request, placed at the end. The available plugins and their operations are listed as follows:\n";

/// One registered plugin
#[derive(Debug)]
pub struct PluginDescriptor {
    /// Unique plugin name
    pub name: String,
    /// Address the plugin serves on, without trailing slash
    pub base_url: String,
    pub operations: OperationIndex,
    pub spec: PluginSpec,
    pub manifest: Option<PluginManifest>,
    /// Supervised child process, if this core launched it
    pub process: Option<PluginProcess>,
    /// Whether the plugin answered its readiness check
    pub ready: bool,
}

impl PluginDescriptor {
    /// Descriptor for a plugin served at `base_url` that this core does not supervise
    #[must_use]
    pub fn new(name: impl Into<String>, base_url: &str, loaded: LoadedSpec) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            operations: loaded.index,
            spec: loaded.spec,
            manifest: None,
            process: None,
            ready: true,
        }
    }
}

/// Registered plugins keyed by name
#[derive(Debug, Default)]
pub struct Registry {
    plugins: BTreeMap<String, PluginDescriptor>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discover, launch and register every plugin under `config.dir`
    ///
    /// Failures are isolated per plugin: a plugin without an entry point or
    /// with a malformed spec is logged and left out.
    pub async fn load_all(config: &PluginsConfig, supervisor: &Supervisor) -> Self {
        let mut registry = Self::new();

        for layout in discover_plugins(&config.dir, &config.entry_file) {
            let host = config.hosts.get(&layout.name).map(String::as_str);
            match load_plugin(&layout, host, supervisor).await {
                Ok(descriptor) => {
                    let base_url = descriptor.base_url.clone();
                    let operations = descriptor.operations.len();
                    let ready = descriptor.ready;
                    if registry.register(descriptor) {
                        tracing::info!(
                            plugin = %layout.name,
                            base_url = %base_url,
                            operations,
                            ready,
                            "loaded plugin"
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(plugin = %layout.name, error = %e, "skipping plugin");
                }
            }
        }

        registry
    }

    /// Register a descriptor
    ///
    /// Names are first-wins: a descriptor whose name is already taken is
    /// dropped (terminating its process) and `false` is returned.
    pub fn register(&mut self, descriptor: PluginDescriptor) -> bool {
        if self.plugins.contains_key(&descriptor.name) {
            tracing::warn!(
                plugin = %descriptor.name,
                base_url = %descriptor.base_url,
                "plugin name already registered, keeping the first"
            );
            return false;
        }
        self.plugins.insert(descriptor.name.clone(), descriptor);
        true
    }

    /// Get a plugin by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PluginDescriptor> {
        self.plugins.get(name)
    }

    /// Registered plugin names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.keys().map(String::as_str).collect()
    }

    /// Iterate over registered plugins in name order
    pub fn iter(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.plugins.values()
    }

    /// Number of registered plugins
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether no plugins are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Combined instruction block for the agent's system context
    ///
    /// # Errors
    ///
    /// Returns an error if the plugin summaries cannot be serialized
    pub fn describe(&self) -> Result<String> {
        let specs: BTreeMap<&str, &PluginSpec> = self
            .plugins
            .iter()
            .map(|(name, plugin)| (name.as_str(), &plugin.spec))
            .collect();

        let listing = if specs.is_empty() {
            String::from("{}\n")
        } else {
            serde_yaml::to_string(&specs)?
        };

        Ok(format!("{INTRODUCTION}{listing}"))
    }

    /// Terminate every supervised plugin process
    pub async fn shutdown(&mut self) {
        for plugin in self.plugins.values_mut() {
            if let Some(process) = plugin.process.as_mut() {
                tracing::debug!(plugin = %plugin.name, pid = ?process.id(), "stopping plugin");
                process.terminate().await;
            }
        }
    }
}

/// Load a single plugin: check entry point, read spec, launch
///
/// The spec is read before launching so a malformed plugin never leaves a
/// stray process behind.
///
/// # Errors
///
/// Returns `Error::Launch` or `Error::SpecFormat`
pub async fn load_plugin(
    layout: &PluginLayout,
    explicit_host: Option<&str>,
    supervisor: &Supervisor,
) -> Result<PluginDescriptor> {
    if !layout.has_entry_point() {
        return Err(Error::Launch {
            plugin: layout.name.clone(),
            reason: "missing entry point".to_string(),
        });
    }

    let loaded = load_spec(&layout.spec_path)?;
    let manifest = load_manifest(&layout.manifest_path);
    let launched = supervisor.launch(layout, explicit_host).await?;

    Ok(PluginDescriptor {
        name: layout.name.clone(),
        base_url: launched.base_url,
        operations: loaded.index,
        spec: loaded.spec,
        manifest,
        process: Some(launched.process),
        ready: launched.ready,
    })
}
