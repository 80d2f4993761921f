// help.rs - Help Command Module
// Builds the help text from the live registry, so disabled commands drop out
// and admin-only commands are shown to admins only.

// ============================================================================
// IMPORTS
// ============================================================================

use std::time::Duration;

use crate::commands::{invocation_prefix, RegistryKey};
use crate::framework::{Command, CommandResult, HandlerError, InvocationContext, Privilege, Registry};

// The listing is long; keep it from being spammed.
const HELP_COOLDOWN: Duration = Duration::from_secs(10);

// ============================================================================
// COMMAND REGISTRATION
// ============================================================================

pub fn command() -> Command {
    Command::new("help", help)
        .aliases(["h", "commands"])
        .usage("help")
        .cooldown(HELP_COOLDOWN)
}

// ============================================================================
// COMMAND IMPLEMENTATION
// ============================================================================

#[derive(Debug)]
struct HelpEntry {
    usage: String,
    aliases: Vec<String>,
    admin: bool,
}

/// Display help information for all available commands
pub async fn help(ctx: InvocationContext) -> CommandResult {
    let prefix = invocation_prefix(&ctx).await;
    let entries = {
        let data = ctx.data.read().await;
        let registry = data
            .get::<RegistryKey>()
            .ok_or_else(|| HandlerError::Internal("command registry not in shared data".to_string()))?;
        visible_entries(registry, ctx.is_admin)
    };

    ctx.reply(render(&prefix, &entries)).await
}

// ============================================================================
// UTILITY FUNCTIONS
// ============================================================================

fn visible_entries(registry: &Registry, is_admin: bool) -> Vec<HelpEntry> {
    registry
        .list()
        .iter()
        .filter(|command| command.is_enabled())
        .filter(|command| is_admin || command.required_privilege() == Privilege::Public)
        .map(|command| HelpEntry {
            usage: if command.usage_text().is_empty() {
                command.name().to_string()
            } else {
                command.usage_text().to_string()
            },
            aliases: command.alias_list().to_vec(),
            admin: command.required_privilege() == Privilege::Admin,
        })
        .collect()
}

fn render(prefix: &str, entries: &[HelpEntry]) -> String {
    let mut text = String::from("**📖 MNS Bot - Command Help**\n\n");
    for entry in entries {
        text.push_str(&format!("• `{}{}`", prefix, entry.usage));
        if !entry.aliases.is_empty() {
            text.push_str(&format!(" (aliases: {})", entry.aliases.join(", ")));
        }
        if entry.admin {
            text.push_str(" 🔧");
        }
        text.push('\n');
    }
    text.push_str("\nCheck out the MNS App at https://metrix.domains/app");
    text
}
