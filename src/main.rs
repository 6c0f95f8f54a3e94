use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use plugboard::plugins::{PortAllocator, Supervisor, discover_plugins, load_spec};
use plugboard::{
    Config, Dispatcher, Registry, compose_system_prompt, parse_request, read_system_prompt,
    render_failure,
};

/// plugboard - launch HTTP plugins and dispatch agent requests to them
#[derive(Parser)]
#[command(name = "plugboard", version, about)]
struct Cli {
    /// Directory containing plugin subdirectories
    #[arg(long, env = "PLUGBOARD_PLUGINS_DIR")]
    plugins_dir: Option<PathBuf>,

    /// Config file (default: ~/.config/plugboard/config.toml)
    #[arg(short, long, env = "PLUGBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Launch plugins and list them with their operations
    List,
    /// Launch plugins and print the agent's system context
    Instructions,
    /// Validate plugin specs without launching anything
    Check,
    /// Launch plugins and dispatch the request at the end of TEXT
    Call {
        /// Agent message; read from stdin when omitted
        text: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,plugboard=info",
        1 => "info,plugboard=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.plugins_dir {
        config.plugins.dir = dir;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Command::Check => cmd_check(&config),
        Command::List => cmd_list(&config).await,
        Command::Instructions => cmd_instructions(&config).await,
        Command::Call { text } => cmd_call(&config, text).await,
    }
}

async fn load_registry(config: &Config) -> Registry {
    let supervisor = Supervisor::new(
        PortAllocator::new(config.plugins.base_port),
        config.plugins.python.clone(),
        config.readiness,
    );
    let registry = Registry::load_all(&config.plugins, &supervisor).await;
    if registry.is_empty() {
        tracing::warn!(dir = %config.plugins.dir.display(), "no plugins loaded");
    }
    registry
}

/// Validate every discovered plugin's spec
fn cmd_check(config: &Config) -> anyhow::Result<()> {
    let mut failures = 0usize;

    for layout in discover_plugins(&config.plugins.dir, &config.plugins.entry_file) {
        if !layout.has_entry_point() {
            println!("{}: missing entry point", layout.name);
            failures += 1;
            continue;
        }
        match load_spec(&layout.spec_path) {
            Ok(loaded) => {
                println!("{}: {} operations", layout.name, loaded.index.len());
                for id in loaded.duplicates {
                    println!("  duplicate operationId: {id}");
                }
            }
            Err(e) => {
                println!("{}: {e}", layout.name);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} plugin(s) failed validation");
    }
    Ok(())
}

/// Print registered plugins
async fn cmd_list(config: &Config) -> anyhow::Result<()> {
    let mut registry = load_registry(config).await;

    for plugin in registry.iter() {
        let display_name = plugin
            .manifest
            .as_ref()
            .map_or(plugin.name.as_str(), |m| m.display_name(&plugin.name));
        let status = if plugin.ready { "ready" } else { "starting" };
        println!("{} ({display_name}) {} [{status}]", plugin.name, plugin.base_url);
        for id in plugin.operations.ids() {
            if let Some(op) = plugin.operations.get(id) {
                println!("  {id}: {} {}", op.method, op.path);
            }
        }
    }

    registry.shutdown().await;
    Ok(())
}

/// Print the system prompt with plugin instructions
async fn cmd_instructions(config: &Config) -> anyhow::Result<()> {
    let mut registry = load_registry(config).await;
    let instructions = registry.describe()?;
    let base = read_system_prompt(&config.system_prompt_path);

    println!("{}", compose_system_prompt(&base, &instructions));

    registry.shutdown().await;
    Ok(())
}

/// Dispatch the request contained in an agent message
async fn cmd_call(config: &Config, text: Option<String>) -> anyhow::Result<()> {
    let text = match text {
        Some(text) => text,
        None => std::io::read_to_string(std::io::stdin())?,
    };

    // Reject malformed or absent requests before launching anything
    let request = match parse_request(&text) {
        Ok(Some(request)) => request,
        Ok(None) => anyhow::bail!("no plugin request found in message"),
        Err(e) => {
            println!("{}", render_failure(&e));
            return Err(e.into());
        }
    };

    let registry = Arc::new(load_registry(config).await);
    let dispatcher = Dispatcher::new(Arc::clone(&registry), config.dispatch_timeout)?;
    let result = dispatcher.dispatch(&request).await;

    drop(dispatcher);
    if let Ok(mut registry) = Arc::try_unwrap(registry) {
        registry.shutdown().await;
    }

    match result {
        Ok(response) => {
            println!("{response}");
            Ok(())
        }
        Err(e) => {
            println!("{}", render_failure(&e));
            Err(e.into())
        }
    }
}
