// version.rs - Version Command Module
// Replies with the package name and version the bot was built from.

// ============================================================================
// IMPORTS
// ============================================================================

use crate::framework::{Command, CommandResult, InvocationContext};

// ============================================================================
// COMMAND REGISTRATION
// ============================================================================

pub fn command() -> Command {
    Command::new("version", version).usage("version")
}

// ============================================================================
// COMMAND IMPLEMENTATION
// ============================================================================

pub async fn version(ctx: InvocationContext) -> CommandResult {
    ctx.reply(format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))
        .await
}
