//! System prompt assembly
//!
//! The agent's system context is a base prompt followed by the registry's
//! plugin instruction block.

use std::path::Path;

/// Default base prompt file, relative to the working directory
pub const DEFAULT_PROMPT_FILE: &str = "system_prompt.txt";

/// Base prompt used when no prompt file exists
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful and reliable assistant.";

/// Read the base system prompt, falling back to [`DEFAULT_SYSTEM_PROMPT`]
#[must_use]
pub fn read_system_prompt(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(prompt) => prompt,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "using default system prompt");
            DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

/// Join the base prompt and plugin instructions
#[must_use]
pub fn compose_system_prompt(base: &str, instructions: &str) -> String {
    let base = base.trim_end();
    if base.is_empty() {
        return instructions.to_string();
    }
    format!("{base}\n\n{instructions}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_default() {
        let prompt = read_system_prompt(Path::new("/nonexistent/system_prompt.txt"));
        assert_eq!(prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn reads_prompt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("system_prompt.txt");
        std::fs::write(&path, "You are a pirate.\n").unwrap();

        assert_eq!(read_system_prompt(&path), "You are a pirate.\n");
    }

    #[test]
    fn composes_with_blank_line() {
        let prompt = compose_system_prompt("Be brief.\n", "Plugins:\n");
        assert_eq!(prompt, "Be brief.\n\nPlugins:\n");
        assert_eq!(compose_system_prompt("", "Plugins:\n"), "Plugins:\n");
    }
}
