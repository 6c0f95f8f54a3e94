//! Shared test utilities

#![allow(dead_code)]

use std::path::Path;

use plugboard::plugins::spec::parse_spec;
use plugboard::plugins::{LoadedSpec, PluginDescriptor};
use plugboard::{PluginsConfig, Registry};

/// Spec of the reference `todo` plugin
pub const TODO_SPEC: &str = r"
openapi: 3.0.1
info:
  title: TODO Plugin
  description: A plugin that allows the user to create and manage a TODO list.
  version: 'v1'
paths:
  /todos/{username}:
    get:
      operationId: get_todos
      summary: Get the list of todos
    post:
      operationId: add_todo
      summary: Add a todo to the list
";

/// Spec of a single-operation `web` plugin
pub const WEB_SPEC: &str = r"
info:
  description: Fetch and compress web pages.
paths:
  /:
    get:
      operationId: fetch
      summary: Fetch a web page
";

/// Parse a spec that is known to be valid
#[must_use]
pub fn spec(yaml: &str) -> LoadedSpec {
    parse_spec(yaml, Path::new("openapi.yaml")).expect("valid test spec")
}

/// Registry with the `todo` plugin served at `base_url`
#[must_use]
pub fn todo_registry(base_url: &str) -> Registry {
    let mut registry = Registry::new();
    registry.register(PluginDescriptor::new("todo", base_url, spec(TODO_SPEC)));
    registry
}

/// Write a plugin directory whose entry point idles until killed
pub fn write_plugin(root: &Path, name: &str, spec: Option<&str>) {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).expect("create plugin dir");
    std::fs::write(dir.join("main.sh"), "sleep 30\n").expect("write entry point");
    if let Some(spec) = spec {
        std::fs::write(dir.join("openapi.yaml"), spec).expect("write spec");
    }
}

/// Plugin config for a test plugins directory using `main.sh` entry points
#[must_use]
pub fn plugins_config(dir: &Path, base_port: u16) -> PluginsConfig {
    PluginsConfig {
        dir: dir.to_path_buf(),
        entry_file: "main.sh".to_string(),
        base_port,
        python: "python3".to_string(),
        hosts: std::collections::HashMap::new(),
    }
}
