//! Plugin request recognition in agent messages
//!
//! An agent asks for a plugin call by ending its message with
//!
//! ```text
//! 💬<plugin name>: <operation id> [key=value ...]
//! <body>
//! ```
//!
//! At most one request is recognized per message and it must run to the end
//! of the text.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// Marker that opens a plugin request
pub const REQUEST_MARKER: char = '💬';

/// Full request shape, anchored at a marker and running to end of text;
/// the header may end in `\n` or `\r\n`
static REQUEST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A💬(?P<plugin>[\w ]+): (?P<operation>\w+)(?P<params>(?: [^\r\n]*)?)(?:\r?\n(?P<body>.*))?\z")
        .expect("valid regex")
});

/// A plugin call extracted from an agent message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginRequest {
    pub plugin: String,
    pub operation: String,
    /// Inline `key=value` parameters
    pub params: HashMap<String, String>,
    /// Everything after the header line
    pub body: String,
}

impl fmt::Display for PluginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{REQUEST_MARKER}{}: {}", self.plugin, self.operation)?;
        let mut params: Vec<_> = self.params.iter().collect();
        params.sort();
        for (key, value) in params {
            write!(f, " {key}={value}")?;
        }
        write!(f, "\n{}", self.body)
    }
}

/// Find the plugin request at the end of `text`
///
/// Markers are tried left to right; the first whose remainder is a complete
/// request wins. Returns `Ok(None)` when the text holds no request.
///
/// # Errors
///
/// Returns `Error::ParamFormat` if a parameter token is not `key=value`
pub fn parse_request(text: &str) -> Result<Option<PluginRequest>> {
    for (start, _) in text.match_indices(REQUEST_MARKER) {
        let Some(caps) = REQUEST_REGEX.captures(&text[start..]) else {
            continue;
        };

        let params = parse_params(&caps["params"])?;
        return Ok(Some(PluginRequest {
            plugin: caps["plugin"].to_string(),
            operation: caps["operation"].to_string(),
            params,
            body: caps
                .name("body")
                .map_or_else(String::new, |m| m.as_str().to_string()),
        }));
    }

    Ok(None)
}

/// Split a whitespace-separated list of `key=value` tokens
///
/// Values may themselves contain `=`; only the first one separates.
///
/// # Errors
///
/// Returns `Error::ParamFormat` naming the first malformed token
pub fn parse_params(segment: &str) -> Result<HashMap<String, String>> {
    segment
        .split_whitespace()
        .map(|token| match token.split_once('=') {
            Some((key, value)) if is_word(key) && !value.is_empty() => {
                Ok((key.to_string(), value.to_string()))
            }
            _ => Err(Error::ParamFormat(token.to_string())),
        })
        .collect()
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}
