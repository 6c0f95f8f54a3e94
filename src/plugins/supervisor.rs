//! Plugin process supervision
//!
//! Each plugin's entry point runs as a child process serving HTTP on a
//! private port (or on an externally supplied host). Ports come from an
//! explicit [`PortAllocator`] so launches never share hidden global state.

use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tokio::process::{Child, Command};

use super::discovery::{MANIFEST_FILE, PluginLayout};
use crate::{Error, Result};

/// First port handed out when none is configured
pub const DEFAULT_BASE_PORT: u16 = 34567;

/// Sequential port allocator; a port held by a launched plugin is never reissued
#[derive(Debug)]
pub struct PortAllocator {
    next: AtomicU32,
}

impl PortAllocator {
    /// Allocator starting at `base`
    #[must_use]
    pub const fn new(base: u16) -> Self {
        Self {
            next: AtomicU32::new(base as u32),
        }
    }

    /// Next free port, or `None` once the port range is exhausted
    pub fn allocate(&self) -> Option<u16> {
        let port = self.next.fetch_add(1, Ordering::SeqCst);
        u16::try_from(port).ok()
    }

    /// Hand back `port` if it is still the most recent allocation
    ///
    /// Used when a launch fails after allocating, so the next plugin gets
    /// the same port. A port followed by a later allocation stays consumed.
    pub fn release(&self, port: u16) {
        let port = u32::from(port);
        let _ = self
            .next
            .compare_exchange(port + 1, port, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Port the next call to [`allocate`](Self::allocate) would return
    #[must_use]
    pub fn peek(&self) -> u32 {
        self.next.load(Ordering::SeqCst)
    }
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_PORT)
    }
}

/// Bounded readiness polling
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPolicy {
    /// Maximum number of polls; zero disables probing
    pub attempts: u32,
    /// Delay between polls
    pub interval: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            attempts: 20,
            interval: Duration::from_millis(250),
        }
    }
}

impl ReadinessPolicy {
    /// Policy that never polls
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            attempts: 0,
            interval: Duration::ZERO,
        }
    }
}

/// A running plugin child process
#[derive(Debug)]
pub struct PluginProcess {
    child: Child,
}

impl PluginProcess {
    /// OS process id, if the child has not been reaped
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Whether the child is still running
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Kill the child and wait for it to exit
    pub async fn terminate(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!(error = %e, "plugin process already exited");
        }
    }
}

/// Outcome of a successful launch
#[derive(Debug)]
pub struct LaunchedPlugin {
    /// Address the plugin serves on, without trailing slash
    pub base_url: String,
    /// Allocated port, when no explicit host was given
    pub port: Option<u16>,
    pub process: PluginProcess,
    /// Whether the readiness check got an answer
    pub ready: bool,
}

/// Launches plugin entry points and waits for them to come up
#[derive(Debug)]
pub struct Supervisor {
    ports: PortAllocator,
    python: String,
    readiness: ReadinessPolicy,
    client: reqwest::Client,
}

impl Supervisor {
    /// Create a supervisor
    #[must_use]
    pub fn new(ports: PortAllocator, python: impl Into<String>, readiness: ReadinessPolicy) -> Self {
        Self {
            ports,
            python: python.into(),
            readiness,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(2))
                .build()
                .unwrap_or_default(),
        }
    }

    /// The supervisor's port allocator
    #[must_use]
    pub const fn ports(&self) -> &PortAllocator {
        &self.ports
    }

    /// Launch a plugin's entry point
    ///
    /// Without `explicit_host` the child gets `--port <next port>` and is
    /// reached at `http://localhost:<port>`; otherwise it gets
    /// `--host <host>` and is reached at the host itself.
    ///
    /// # Errors
    ///
    /// Returns `Error::Launch` if the entry point is missing, has no known
    /// executor, no port is left, or the process cannot be spawned. A failed
    /// launch leaves the port allocator where it was.
    pub async fn launch(
        &self,
        layout: &PluginLayout,
        explicit_host: Option<&str>,
    ) -> Result<LaunchedPlugin> {
        if !layout.has_entry_point() {
            return Err(launch_error(&layout.name, "missing entry point"));
        }

        let (program, args) = determine_executor(&layout.entry_path, &self.python)
            .map_err(|reason| launch_error(&layout.name, reason))?;

        let (base_url, port, flag, value) = match explicit_host {
            Some(host) => {
                let host = host.trim_end_matches('/').to_string();
                (host.clone(), None, "--host", host)
            }
            None => {
                let port = self
                    .ports
                    .allocate()
                    .ok_or_else(|| launch_error(&layout.name, "plugin port range exhausted"))?;
                (
                    format!("http://localhost:{port}"),
                    Some(port),
                    "--port",
                    port.to_string(),
                )
            }
        };

        let spawned = Command::new(&program)
            .args(&args)
            .arg(flag)
            .arg(&value)
            .current_dir(&layout.dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let child = match spawned {
            Ok(child) => child,
            Err(e) => {
                if let Some(port) = port {
                    self.ports.release(port);
                }
                return Err(launch_error(
                    &layout.name,
                    format!("failed to spawn {program}: {e}"),
                ));
            }
        };

        tracing::debug!(
            plugin = %layout.name,
            pid = ?child.id(),
            base_url = %base_url,
            "spawned plugin process"
        );

        let ready = wait_ready(&self.client, &base_url, self.readiness).await;
        if !ready && self.readiness.attempts > 0 {
            tracing::warn!(
                plugin = %layout.name,
                base_url = %base_url,
                attempts = self.readiness.attempts,
                "plugin did not answer readiness check"
            );
        }

        Ok(LaunchedPlugin {
            base_url,
            port,
            process: PluginProcess { child },
            ready,
        })
    }
}

fn launch_error(plugin: &str, reason: impl Into<String>) -> Error {
    Error::Launch {
        plugin: plugin.to_string(),
        reason: reason.into(),
    }
}

/// Poll the plugin's manifest endpoint until it answers
///
/// Any HTTP response counts as ready; only transport failures are retried.
pub async fn wait_ready(
    client: &reqwest::Client,
    base_url: &str,
    readiness: ReadinessPolicy,
) -> bool {
    let url = format!("{base_url}/{MANIFEST_FILE}");

    for attempt in 1..=readiness.attempts {
        match client.get(&url).send().await {
            Ok(response) => {
                tracing::debug!(url = %url, status = %response.status(), attempt, "plugin ready");
                return true;
            }
            Err(e) => {
                tracing::trace!(url = %url, error = %e, attempt, "plugin not ready yet");
            }
        }
        if attempt < readiness.attempts {
            tokio::time::sleep(readiness.interval).await;
        }
    }

    false
}

/// Determine how to run an entry point based on its extension
fn determine_executor(
    entry_path: &Path,
    python: &str,
) -> std::result::Result<(String, Vec<String>), String> {
    let extension = entry_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let path_str = entry_path
        .to_str()
        .ok_or("invalid entry point path")?
        .to_string();

    match extension {
        "py" => Ok((python.to_string(), vec![path_str])),
        "js" | "mjs" => Ok(("node".to_string(), vec![path_str])),
        "ts" => Ok(("bun".to_string(), vec!["run".to_string(), path_str])),
        "sh" => Ok(("bash".to_string(), vec![path_str])),
        "" => Ok((path_str, vec![])),
        _ => Err(format!("unknown entry point extension: .{extension}")),
    }
}

/// Locate a Python interpreter on `PATH`, preferring `python3`
#[must_use]
pub fn default_python() -> String {
    ["python3", "python"]
        .into_iter()
        .find(|name| which::which(name).is_ok())
        .unwrap_or("python3")
        .to_string()
}
