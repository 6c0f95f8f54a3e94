//! Plugin request dispatch
//!
//! Resolves a [`PluginRequest`] against the [`Registry`] and performs the
//! HTTP call on the live plugin. Non-2xx responses are returned as content;
//! only transport failures are errors.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::plugins::Registry;
use crate::request::{PluginRequest, parse_request};
use crate::{Error, Result};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Routes parsed plugin requests to plugin HTTP endpoints
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<Registry>,
    client: Client,
}

impl Dispatcher {
    /// Create a dispatcher with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(registry: Arc<Registry>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("plugboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Transport)?;

        Ok(Self { registry, client })
    }

    /// Perform a plugin request and return the raw response text
    ///
    /// # Errors
    ///
    /// Returns `UnknownPlugin`, `UnknownOperation` or `MissingParameter`
    /// before any network I/O if the request cannot be resolved, and
    /// `Transport` if the plugin cannot be reached
    pub async fn dispatch(&self, request: &PluginRequest) -> Result<String> {
        let plugin = self
            .registry
            .get(&request.plugin)
            .ok_or_else(|| Error::UnknownPlugin(request.plugin.clone()))?;

        let operation = plugin.operations.get(&request.operation).ok_or_else(|| {
            Error::UnknownOperation {
                plugin: request.plugin.clone(),
                operation: request.operation.clone(),
            }
        })?;

        let path = resolve_path(&operation.path, |name| {
            request.params.get(name).map(String::as_str)
        })?;
        let url = format!("{}{path}", plugin.base_url);

        tracing::debug!(
            plugin = %plugin.name,
            operation = %request.operation,
            method = %operation.method,
            url = %url,
            body_len = request.body.len(),
            "dispatching plugin request"
        );

        let response = self
            .client
            .request(operation.method.clone(), &url)
            .body(request.body.clone())
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(plugin = %plugin.name, status = %status, "plugin returned error status");
        }

        response.text().await.map_err(Error::Transport)
    }

    /// Handle an agent message end to end
    ///
    /// Returns `None` when the message holds no plugin request. Failures are
    /// rendered as text so the agent can read them and retry.
    pub async fn respond(&self, message: &str) -> Option<String> {
        let request = match parse_request(message) {
            Ok(Some(request)) => request,
            Ok(None) => return None,
            Err(e) => return Some(render_failure(&e)),
        };

        match self.dispatch(&request).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(plugin = %request.plugin, error = %e, "plugin request failed");
                Some(render_failure(&e))
            }
        }
    }
}

/// Agent-readable description of a dispatch failure
#[must_use]
pub fn render_failure(error: &Error) -> String {
    format!("Plugin request failed: {error}")
}

/// Substitute `{name}` placeholders in a path template
///
/// Values are percent-encoded. Parameters the template does not reference
/// are ignored.
///
/// # Errors
///
/// Returns `Error::MissingParameter` for the first placeholder `lookup`
/// cannot supply
pub fn resolve_path<'a>(
    template: &str,
    lookup: impl Fn(&str) -> Option<&'a str>,
) -> Result<String> {
    let mut resolved = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        let name = &rest[open + 1..close];
        let value = lookup(name).ok_or_else(|| Error::MissingParameter {
            path: template.to_string(),
            name: name.to_string(),
        })?;

        resolved.push_str(&rest[..open]);
        resolved.push_str(&urlencoding::encode(value));
        rest = &rest[close + 1..];
    }

    resolved.push_str(rest);
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn resolve(template: &str, params: &[(&str, &str)]) -> Result<String> {
        let params: HashMap<String, String> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        resolve_path(template, |name| params.get(name).map(String::as_str))
    }

    #[test]
    fn substitutes_placeholders() {
        assert_eq!(resolve("/todos/{username}", &[("username", "alice")]).unwrap(), "/todos/alice");
        assert_eq!(
            resolve("/users/{user}/lists/{list}", &[("user", "a"), ("list", "b")]).unwrap(),
            "/users/a/lists/b"
        );
    }

    #[test]
    fn ignores_extra_params() {
        assert_eq!(resolve("/", &[("unused", "x")]).unwrap(), "/");
    }

    #[test]
    fn missing_parameter_fails() {
        let err = resolve("/todos/{username}", &[]).unwrap_err();
        match err {
            Error::MissingParameter { path, name } => {
                assert_eq!(path, "/todos/{username}");
                assert_eq!(name, "username");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn values_are_percent_encoded() {
        assert_eq!(
            resolve("/todos/{username}", &[("username", "a b/c")]).unwrap(),
            "/todos/a%20b%2Fc"
        );
    }

    #[test]
    fn unterminated_brace_is_literal() {
        assert_eq!(resolve("/odd/{name", &[]).unwrap(), "/odd/{name");
    }

    #[test]
    fn failures_render_as_text() {
        let text = render_failure(&Error::UnknownPlugin("calendar".into()));
        assert_eq!(text, "Plugin request failed: unknown plugin: calendar");
    }
}
