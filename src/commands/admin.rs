// admin.rs - Administrative commands for bot management
// This module contains commands that only members of the configured admin
// set can use. The access check itself happens in the dispatcher; by the time
// these handlers run the caller is already authorized.

// ============================================================================
// IMPORTS
// ============================================================================

use crate::commands::{RegistryKey, SettingsKey, ShutdownKey};
use crate::framework::{Command, CommandResult, HandlerError, InvocationContext, Privilege};

// ============================================================================
// COMMAND REGISTRATION
// ============================================================================

pub fn status_command() -> Command {
    Command::new("status", status)
        .privilege(Privilege::Admin)
        .usage("status")
}

pub fn shutdown_command() -> Command {
    Command::new("shutdown", shutdown)
        .aliases(["stopbot"])
        .privilege(Privilege::Admin)
        .usage("shutdown")
}

// ============================================================================
// COMMAND IMPLEMENTATION
// ============================================================================

/// Show registry and cooldown settings
pub async fn status(ctx: InvocationContext) -> CommandResult {
    let text = {
        let data = ctx.data.read().await;
        let registry = data
            .get::<RegistryKey>()
            .ok_or_else(|| HandlerError::Internal("command registry not in shared data".to_string()))?;
        let disabled: Vec<&str> = registry
            .list()
            .iter()
            .filter(|command| !command.is_enabled())
            .map(|command| command.name())
            .collect();
        let cooldown = data
            .get::<SettingsKey>()
            .map(|settings| format!("{}ms", settings.cooldown.as_millis()))
            .unwrap_or_else(|| "unknown".to_string());

        format!(
            "**🔧 Bot Status**\n\nCommands registered: {}\nDisabled: {}\nCooldown window: {}",
            registry.len(),
            if disabled.is_empty() { "none".to_string() } else { disabled.join(", ") },
            cooldown
        )
    };

    ctx.reply(text).await
}

/// Shut the bot down gracefully
pub async fn shutdown(ctx: InvocationContext) -> CommandResult {
    ctx.reply("🛑 **Bot Shutdown Initiated**\n\nClosing the gateway connection...")
        .await?;

    log::info!("[ADMIN] Bot shutdown requested by {}", ctx.caller);

    let data = ctx.data.read().await;
    let trigger = data
        .get::<ShutdownKey>()
        .ok_or_else(|| HandlerError::Internal("shutdown trigger not in shared data".to_string()))?;
    trigger
        .send(true)
        .map_err(|_| HandlerError::Internal("shutdown receiver already dropped".to_string()))
}
