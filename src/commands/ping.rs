// ping.rs - Ping Command Module
// This module implements the ^ping command, a liveness check that replies
// with "pong!" to the channel it was invoked from.
//
// Used by: commands/mod.rs (command registration)

// ============================================================================
// IMPORTS
// ============================================================================

use crate::framework::{Command, CommandResult, InvocationContext};

// ============================================================================
// COMMAND REGISTRATION
// ============================================================================

pub fn command() -> Command {
    Command::new("ping", ping).usage("ping")
}

// ============================================================================
// COMMAND IMPLEMENTATION
// ============================================================================

/// Main ^ping command handler
/// Supports:
///   - ^ping
///   - /ping
pub async fn ping(ctx: InvocationContext) -> CommandResult {
    ctx.reply("pong!").await
}
