// commands/mod.rs - Command Module Registry
// This file declares all command modules and registers every command with the
// dispatcher's Registry at start-up, in the order help lists them.

pub mod admin;          // Administrative commands (admin set only)
pub mod help;           // Help listing built from the registry
pub mod mns;            // Name-service record lookups (owner, addr, text, dns...)
pub mod ping;           // Basic ping/pong functionality
pub mod tools;          // Offline helpers (hash, hex <-> MRX address)
pub mod version;        // Package name and version

use std::sync::Arc;
use std::time::Duration;

use serenity::prelude::TypeMapKey;
use tokio::sync::watch;

use crate::chain::Network;
use crate::framework::{InvocationContext, Registry, RegistryError};
use crate::framework::context::InvocationSource;

/// TypeMap key for the shared command registry (help, status).
pub struct RegistryKey;
impl TypeMapKey for RegistryKey {
    type Value = Arc<Registry>;
}

/// Start-up settings handlers need to render replies.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub prefix: String,
    pub cooldown: Duration,
    pub network: Network,
}

pub struct SettingsKey;
impl TypeMapKey for SettingsKey {
    type Value = BotSettings;
}

/// TypeMap key for the process shutdown trigger observed by main.
pub struct ShutdownKey;
impl TypeMapKey for ShutdownKey {
    type Value = watch::Sender<bool>;
}

/// Register every command. Fails on the first name/alias collision.
pub fn register_all(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register(ping::command())?;
    registry.register(help::command())?;
    registry.register(version::command())?;
    for command in mns::commands().into_iter().chain(tools::commands()) {
        registry.register(command)?;
    }
    registry.register(admin::status_command())?;
    registry.register(admin::shutdown_command())?;
    Ok(())
}

/// Apply the configured disable list. Unknown names are fatal.
pub fn apply_disabled(registry: &Registry, disabled: &[String]) -> Result<(), RegistryError> {
    for name in disabled {
        registry.set_enabled(name, false)?;
        log::info!("[COMMANDS] Disabled {}", name);
    }
    Ok(())
}

/// How a command is invoked from where this context came from:
/// `^name` for messages, `/name` for slash interactions.
pub async fn invocation_prefix(ctx: &InvocationContext) -> String {
    match ctx.source {
        InvocationSource::Interaction { .. } => "/".to_string(),
        InvocationSource::Message { .. } => {
            let data = ctx.data.read().await;
            data.get::<SettingsKey>()
                .map(|settings| settings.prefix.clone())
                .unwrap_or_else(|| crate::config::DEFAULT_PREFIX.to_string())
        }
    }
}

/// The configured network, MainNet when settings are absent.
pub async fn network(ctx: &InvocationContext) -> Network {
    let data = ctx.data.read().await;
    data.get::<SettingsKey>()
        .map(|settings| settings.network)
        .unwrap_or_default()
}
