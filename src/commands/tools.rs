// tools.rs - Offline Utility Commands
// Commands that need no name records: hashing and MRX <-> hex address
// conversion. The network (MainNet/TestNet) decides the address version byte.
//
// Supports:
//   - ^hash <algorithm> <data> [utf8|hex]
//   - ^tohexaddress <MRX address>
//   - ^fromhexaddress <hex address>
//
// Used by: commands/mod.rs (command registration)

// ============================================================================
// IMPORTS
// ============================================================================

use crate::chain::{self, HashAlgorithm, InputEncoding};
use crate::commands::{invocation_prefix, network};
use crate::framework::{Command, CommandResult, InvocationContext};

// ============================================================================
// COMMAND REGISTRATION
// ============================================================================

pub fn commands() -> Vec<Command> {
    vec![
        Command::new("hash", hash).usage("hash <namehash|keccak256|sha256|sha512|ripemd160> <data> [utf8|hex]"),
        Command::new("tohexaddress", tohexaddress).usage("tohexaddress <address>"),
        Command::new("fromhexaddress", fromhexaddress).usage("fromhexaddress <hex address>"),
    ]
}

// ============================================================================
// COMMAND IMPLEMENTATION
// ============================================================================

/// Hash utf8 or hex input with one of the supported algorithms
pub async fn hash(ctx: InvocationContext) -> CommandResult {
    let (Some(algorithm), Some(data)) = (ctx.arg(0), ctx.arg(1)) else {
        let prefix = invocation_prefix(&ctx).await;
        return ctx
            .reply(format!("Usage: `{}hash <algorithm> <data> [utf8|hex]`", prefix))
            .await;
    };

    let Ok(encoding) = ctx.arg(2).map_or(Ok(InputEncoding::default()), str::parse::<InputEncoding>) else {
        return ctx.reply("Error: Invalid encoding.").await;
    };
    let Ok(bytes) = encoding.decode(data) else {
        return ctx.reply("Error: Invalid hex data.").await;
    };
    let Ok(algorithm) = algorithm.parse::<HashAlgorithm>() else {
        return ctx.reply("Error: Invalid algorithm.").await;
    };

    ctx.reply(format!(
        "The {} hash of the data is `{}`",
        algorithm.as_str(),
        algorithm.digest_hex(&bytes)
    ))
    .await
}

pub async fn tohexaddress(ctx: InvocationContext) -> CommandResult {
    let Some(address) = ctx.arg(0) else {
        return ctx.reply("Error: No address provided.").await;
    };
    match chain::to_hex_address(network(&ctx).await, address) {
        Ok(hex) => {
            ctx.reply(format!("The hex address for `{}` is `{}`", address, hex))
                .await
        }
        Err(_) => {
            ctx.reply(format!("Error: The address `{}` is invalid.", address))
                .await
        }
    }
}

pub async fn fromhexaddress(ctx: InvocationContext) -> CommandResult {
    let Some(hex) = ctx.arg(0) else {
        return ctx.reply("Error: No address provided.").await;
    };
    match chain::from_hex_address(network(&ctx).await, hex) {
        Ok(address) => {
            ctx.reply(format!("The MRX address for `{}` is `{}`", hex, address))
                .await
        }
        Err(_) => {
            ctx.reply(format!("Error: The hex address `{}` is invalid.", hex))
                .await
        }
    }
}
