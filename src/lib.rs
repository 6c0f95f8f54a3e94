//! plugboard - plugin registry and dispatch core for conversational agents
//!
//! Plugins are independent HTTP services described by an OpenAPI document.
//! This library discovers them, launches each as a supervised child process
//! on a private port, builds the instruction block that teaches an agent how
//! to call them, and routes the agent's requests to the right endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Conversation layer                    │
//! │   system prompt  ◄── instructions    agent reply ──┐  │
//! └────────────────────────▲───────────────────────────┼──┘
//!                          │                           │
//! ┌────────────────────────┴──────────┐   ┌────────────▼─────────┐
//! │             Registry              │◄──│ Request parser       │
//! │  discovery │ spec │ supervisor    │   │ Dispatcher           │
//! └────────────────────────┬──────────┘   └────────────┬─────────┘
//!                          │ spawn                     │ HTTP
//! ┌────────────────────────▼───────────────────────────▼─────────┐
//! │        Plugin processes (todo, web, wolfram, python)          │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod plugins;
pub mod prompt;
pub mod request;

pub use config::{Config, PluginsConfig};
pub use dispatch::{Dispatcher, render_failure, resolve_path};
pub use error::{Error, Result};
pub use plugins::{PluginDescriptor, PortAllocator, ReadinessPolicy, Registry, Supervisor};
pub use prompt::{compose_system_prompt, read_system_prompt};
pub use request::{PluginRequest, parse_request};
