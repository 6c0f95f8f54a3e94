//! Plugin specification loading (`openapi.yaml`)
//!
//! Only the fields the registry needs are read: `info.description` and, for
//! every path and HTTP method, the operation's `operationId` and `summary`.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Path item keys that name HTTP operations
const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Where an operation lives on the plugin's HTTP server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// Path template, e.g. `/todos/{username}`
    pub path: String,
    /// HTTP method
    pub method: Method,
}

/// Operation id to endpoint mapping for one plugin
#[derive(Debug, Clone, Default)]
pub struct OperationIndex {
    operations: HashMap<String, Operation>,
}

impl OperationIndex {
    /// Create an empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an operation, returning the one it replaced
    pub fn insert(&mut self, id: impl Into<String>, operation: Operation) -> Option<Operation> {
        self.operations.insert(id.into(), operation)
    }

    /// Look up an operation by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Operation> {
        self.operations.get(id)
    }

    /// Operation ids, sorted
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.operations.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of operations
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether no operations are declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// The part of a plugin spec shown to the agent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PluginSpec {
    /// Human-readable plugin description
    pub description: String,
    /// Operation id to summary
    pub operations: BTreeMap<String, String>,
}

/// Result of loading a spec document
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub spec: PluginSpec,
    pub index: OperationIndex,
    /// Operation ids declared more than once (later declarations win)
    pub duplicates: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SpecDocument {
    info: Option<SpecInfo>,
    paths: Option<BTreeMap<String, serde_yaml::Mapping>>,
}

#[derive(Debug, Deserialize)]
struct SpecInfo {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationObject {
    #[serde(rename = "operationId")]
    operation_id: Option<String>,
    summary: Option<String>,
}

/// Read and parse a spec document from disk
///
/// # Errors
///
/// Returns `Error::SpecFormat` if the file cannot be read, is not valid
/// YAML, or lacks a required field
pub fn load_spec(path: &Path) -> Result<LoadedSpec> {
    let content = std::fs::read_to_string(path).map_err(|e| spec_error(path, e.to_string()))?;
    parse_spec(&content, path)
}

/// Parse a spec document; `origin` is used only for error reporting
///
/// # Errors
///
/// Returns `Error::SpecFormat` on invalid YAML or missing fields
pub fn parse_spec(content: &str, origin: &Path) -> Result<LoadedSpec> {
    let doc: SpecDocument =
        serde_yaml::from_str(content).map_err(|e| spec_error(origin, e.to_string()))?;

    let description = doc
        .info
        .and_then(|info| info.description)
        .ok_or_else(|| spec_error(origin, "missing info.description"))?;
    let paths = doc
        .paths
        .ok_or_else(|| spec_error(origin, "missing paths"))?;

    let mut spec = PluginSpec {
        description,
        operations: BTreeMap::new(),
    };
    let mut index = OperationIndex::new();
    let mut duplicates = Vec::new();

    for (template, item) in paths {
        for (key, value) in item {
            let Some(method_name) = key.as_str().filter(|k| HTTP_METHODS.contains(k)) else {
                continue;
            };

            let op: OperationObject = serde_yaml::from_value(value).map_err(|e| {
                spec_error(origin, format!("{method_name} {template}: {e}"))
            })?;
            let id = op.operation_id.ok_or_else(|| {
                spec_error(origin, format!("{method_name} {template}: missing operationId"))
            })?;
            let summary = op.summary.ok_or_else(|| {
                spec_error(origin, format!("{method_name} {template}: missing summary"))
            })?;
            let method = Method::from_bytes(method_name.to_ascii_uppercase().as_bytes())
                .map_err(|e| spec_error(origin, e.to_string()))?;

            let replaced = index.insert(
                id.clone(),
                Operation {
                    path: template.clone(),
                    method,
                },
            );
            if replaced.is_some() {
                tracing::warn!(
                    spec = %origin.display(),
                    operation = %id,
                    "duplicate operationId, later declaration wins"
                );
                duplicates.push(id.clone());
            }
            spec.operations.insert(id, summary);
        }
    }

    Ok(LoadedSpec {
        spec,
        index,
        duplicates,
    })
}

fn spec_error(path: &Path, reason: impl Into<String>) -> Error {
    Error::SpecFormat {
        path: PathBuf::from(path),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TODO_SPEC: &str = r"
openapi: 3.0.1
info:
  title: TODO Plugin
  description: A plugin that allows the user to create and manage a TODO list.
  version: 'v1'
paths:
  /todos/{username}:
    parameters:
      - in: path
        name: username
        required: true
    get:
      operationId: getTodos
      summary: Get the list of todos
    post:
      operationId: addTodo
      summary: Add a todo to the list
    delete:
      operationId: deleteTodo
      summary: Delete a todo from the list
";

    fn origin() -> &'static Path {
        Path::new("todo/openapi.yaml")
    }

    #[test]
    fn parses_operations() {
        let loaded = parse_spec(TODO_SPEC, origin()).unwrap();

        assert_eq!(
            loaded.spec.description,
            "A plugin that allows the user to create and manage a TODO list."
        );
        assert_eq!(loaded.index.len(), 3);
        assert_eq!(loaded.spec.operations.len(), 3);
        assert!(loaded.duplicates.is_empty());

        let add = loaded.index.get("addTodo").unwrap();
        assert_eq!(add.path, "/todos/{username}");
        assert_eq!(add.method, Method::POST);
        assert_eq!(loaded.index.get("deleteTodo").unwrap().method, Method::DELETE);
        assert_eq!(
            loaded.spec.operations["getTodos"],
            "Get the list of todos"
        );
    }

    #[test]
    fn counts_every_path_method_pair() {
        let yaml = r"
info:
  description: Math
paths:
  /a:
    get: { operationId: a_get, summary: A }
    post: { operationId: a_post, summary: A }
  /b:
    put: { operationId: b_put, summary: B }
  /c/{x}:
    patch: { operationId: c_patch, summary: C }
";
        let loaded = parse_spec(yaml, origin()).unwrap();
        assert_eq!(loaded.index.len(), 4);
        assert_eq!(loaded.index.ids(), vec!["a_get", "a_post", "b_put", "c_patch"]);
    }

    #[test]
    fn flags_duplicate_operation_ids() {
        let yaml = r"
info:
  description: Dup
paths:
  /first:
    get: { operationId: fetch, summary: First }
  /second:
    get: { operationId: fetch, summary: Second }
";
        let loaded = parse_spec(yaml, origin()).unwrap();
        assert_eq!(loaded.duplicates, vec!["fetch"]);
        assert_eq!(loaded.index.len(), 1);
        assert_eq!(loaded.index.get("fetch").unwrap().path, "/second");
        assert_eq!(loaded.spec.operations["fetch"], "Second");
    }

    #[test]
    fn missing_operation_id_is_rejected() {
        let yaml = r"
info:
  description: Broken
paths:
  /x:
    get: { summary: No id }
";
        let err = parse_spec(yaml, origin()).unwrap_err();
        assert!(matches!(err, Error::SpecFormat { .. }));
        assert!(err.to_string().contains("missing operationId"));
    }

    #[test]
    fn missing_description_is_rejected() {
        let yaml = "info:\n  title: x\npaths: {}\n";
        let err = parse_spec(yaml, origin()).unwrap_err();
        assert!(err.to_string().contains("missing info.description"));
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        let err = parse_spec("info: [unclosed", origin()).unwrap_err();
        assert!(matches!(err, Error::SpecFormat { .. }));
    }

    #[test]
    fn unreadable_file_is_rejected() {
        let err = load_spec(Path::new("/nonexistent/openapi.yaml")).unwrap_err();
        assert!(matches!(err, Error::SpecFormat { .. }));
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("openapi.yaml");
        std::fs::write(&path, TODO_SPEC).unwrap();

        let loaded = load_spec(&path).unwrap();
        assert_eq!(loaded.index.len(), 3);
    }
}
