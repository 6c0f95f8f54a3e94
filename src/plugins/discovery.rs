//! Plugin discovery - scan a plugins directory for plugin layouts

use std::path::{Path, PathBuf};

/// Manifest location relative to the plugin directory
pub const MANIFEST_FILE: &str = ".well-known/ai-plugin.json";

/// Spec document location relative to the plugin directory
pub const SPEC_FILE: &str = "openapi.yaml";

/// Default entry point relative to the plugin directory
pub const DEFAULT_ENTRY_FILE: &str = "main.py";

/// Well-known file locations of one candidate plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginLayout {
    /// Plugin name (directory name)
    pub name: String,
    /// Plugin directory
    pub dir: PathBuf,
    pub manifest_path: PathBuf,
    pub spec_path: PathBuf,
    pub entry_path: PathBuf,
}

impl PluginLayout {
    /// Layout for the plugin living in `dir`
    #[must_use]
    pub fn new(name: impl Into<String>, dir: PathBuf, entry_file: &str) -> Self {
        Self {
            name: name.into(),
            manifest_path: dir.join(MANIFEST_FILE),
            spec_path: dir.join(SPEC_FILE),
            entry_path: dir.join(entry_file),
            dir,
        }
    }

    /// Whether the entry point exists; the only launchability signal
    #[must_use]
    pub fn has_entry_point(&self) -> bool {
        self.entry_path.is_file()
    }
}

/// Whether a directory entry name is hidden or private
fn is_private(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

/// Scan a plugins directory for candidate plugins
///
/// Every entry not starting with `.` or `_` becomes a layout, sorted by name.
/// Entries without an entry point are kept here and rejected at launch.
#[must_use]
pub fn discover_plugins(dir: &Path, entry_file: &str) -> Vec<PluginLayout> {
    if !dir.is_dir() {
        tracing::warn!(path = %dir.display(), "plugin directory does not exist");
        return Vec::new();
    }

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "failed to read plugin directory");
            return Vec::new();
        }
    };

    let mut layouts: Vec<PluginLayout> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_owned();
            if is_private(&name) {
                tracing::debug!(name = %name, "skipping private plugin entry");
                return None;
            }
            Some(PluginLayout::new(name, entry.path(), entry_file))
        })
        .collect();

    layouts.sort_by(|a, b| a.name.cmp(&b.name));
    layouts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_plugin(root: &Path, name: &str) {
        let dir = root.join(name);
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join(DEFAULT_ENTRY_FILE), "").unwrap();
    }

    #[test]
    fn discover_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_plugins(dir.path(), DEFAULT_ENTRY_FILE).is_empty());
    }

    #[test]
    fn skips_hidden_and_private_entries() {
        let dir = tempfile::tempdir().unwrap();
        make_plugin(dir.path(), "todo");
        make_plugin(dir.path(), "web");
        make_plugin(dir.path(), ".git");
        make_plugin(dir.path(), "__pycache__");
        std::fs::write(dir.path().join("__init__.py"), "").unwrap();

        let names: Vec<String> = discover_plugins(dir.path(), DEFAULT_ENTRY_FILE)
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["todo", "web"]);
    }

    #[test]
    fn layout_paths() {
        let dir = tempfile::tempdir().unwrap();
        make_plugin(dir.path(), "todo");

        let layouts = discover_plugins(dir.path(), DEFAULT_ENTRY_FILE);
        let todo = &layouts[0];
        assert_eq!(todo.spec_path, dir.path().join("todo").join("openapi.yaml"));
        assert_eq!(
            todo.manifest_path,
            dir.path().join("todo").join(".well-known/ai-plugin.json")
        );
        assert!(todo.has_entry_point());
    }

    #[test]
    fn entry_point_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("empty")).unwrap();

        let layouts = discover_plugins(dir.path(), DEFAULT_ENTRY_FILE);
        assert_eq!(layouts.len(), 1);
        assert!(!layouts[0].has_entry_point());
    }

    #[test]
    fn skip_nonexistent_dir() {
        assert!(discover_plugins(Path::new("/nonexistent/path"), DEFAULT_ENTRY_FILE).is_empty());
    }
}
