//! Plugin system for plugboard
//!
//! Plugins are subdirectories of a plugins directory, each holding an
//! `openapi.yaml` spec, an optional `.well-known/ai-plugin.json` manifest and
//! an entry point that serves the spec's operations over HTTP.

pub mod discovery;
pub mod manifest;
pub mod registry;
pub mod spec;
pub mod supervisor;

pub use discovery::{PluginLayout, discover_plugins};
pub use manifest::PluginManifest;
pub use registry::{INTRODUCTION, PluginDescriptor, Registry};
pub use spec::{LoadedSpec, Operation, OperationIndex, PluginSpec, load_spec};
pub use supervisor::{PluginProcess, PortAllocator, ReadinessPolicy, Supervisor};
