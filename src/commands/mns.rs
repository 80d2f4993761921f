// mns.rs - Name-service Lookup Commands
// One handler per record kind. Each one is straight-line: read the arguments,
// look the name up through the shared NameResolver, format a reply. Resolver
// failures propagate as HandlerError and are reported by the dispatcher.
//
// Supports:
//   - ^owner <name>
//   - ^resolver <name>
//   - ^info <name | MRX address | hex address>
//   - ^addr <name> [coin]              (alias: address, coin defaults to MRX)
//   - ^text <name> <key>               (alias: txt)
//   - ^name <name>
//   - ^pubkey <name>
//   - ^contenthash <name>              (alias: cthash)
//   - ^interface <name> <interface id> (alias: iface)
//   - ^abi <name> <content type>
//   - ^dns <name> <dns name> <record type>
//
// Used by: commands/mod.rs (command registration)

// ============================================================================
// IMPORTS
// ============================================================================

use std::sync::Arc;

use crate::chain;
use crate::commands::{invocation_prefix, network};
use crate::framework::{Command, CommandResult, HandlerError, InvocationContext};
use crate::resolver::{NameRecord, NameResolver, ResolverKey};

pub const DEFAULT_COIN: &str = "MRX";

const RECORD_MISSING: &str = "Error: Record does not exist";
const NO_RESOLVER: &str = "Error: No resolver";
const APP_URL: &str = "https://metrix.domains/app/name";
const ZERO_HASH: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

// Discord rejects messages over 2000 characters.
const ABI_PREVIEW_CHARS: usize = 1500;

/// ABI content types a resolver can store.
const ABI_ENCODINGS: [(u32, &str); 4] = [(1, "JSON"), (2, "zlib-compressed JSON"), (4, "CBOR"), (8, "URI")];

const DNS_RECORD_TYPES: &[(&str, u16)] = &[
    ("A", 1), ("NS", 2), ("CNAME", 5), ("SOA", 6), ("PTR", 12), ("HINFO", 13),
    ("MX", 15), ("TXT", 16), ("RP", 17), ("AFSDB", 18), ("SIG", 24), ("KEY", 25),
    ("AAAA", 28), ("LOC", 29), ("SRV", 33), ("NAPTR", 35), ("KX", 36), ("CERT", 37),
    ("DNAME", 39), ("OPT", 41), ("APL", 42), ("DS", 43), ("SSHFP", 44), ("IPSECKEY", 45),
    ("RRSIG", 46), ("NSEC", 47), ("DNSKEY", 48), ("DHCID", 49), ("NSEC3", 50),
    ("NSEC3PARAM", 51), ("TLSA", 52), ("SMIMEA", 53), ("HIP", 55), ("CDS", 59),
    ("CDNSKEY", 60), ("OPENPGPKEY", 61), ("CSYNC", 62), ("ZONEMD", 63), ("SVCB", 64),
    ("HTTPS", 65), ("EUI48", 108), ("EUI64", 109), ("TKEY", 249), ("TSIG", 250),
    ("IXFR", 251), ("AXFR", 252), ("*", 255), ("URI", 256), ("CAA", 257), ("TA", 32768),
    ("DLV", 32769),
];

// ============================================================================
// COMMAND REGISTRATION
// ============================================================================

pub fn commands() -> Vec<Command> {
    vec![
        Command::new("owner", owner).usage("owner <name>"),
        Command::new("resolver", resolver).usage("resolver <name>"),
        Command::new("info", info).usage("info <name>"),
        Command::new("addr", addr)
            .aliases(["address"])
            .usage("addr <name> [coin]"),
        Command::new("text", text)
            .aliases(["txt"])
            .usage("text <name> <key>"),
        Command::new("name", name).usage("name <name>"),
        Command::new("pubkey", pubkey).usage("pubkey <name>"),
        Command::new("contenthash", contenthash)
            .aliases(["cthash"])
            .usage("contenthash <name>"),
        Command::new("interface", interface)
            .aliases(["iface"])
            .usage("interface <name> <interface id>"),
        Command::new("abi", abi).usage("abi <name> <1|2|4|8>"),
        Command::new("dns", dns).usage("dns <name> <dns name> <record type>"),
    ]
}

// ============================================================================
// COMMAND IMPLEMENTATION
// ============================================================================

pub async fn owner(ctx: InvocationContext) -> CommandResult {
    let Some(name) = ctx.arg(0).map(str::to_string) else {
        return usage(&ctx, "owner <name>").await;
    };
    let Some(record) = fetch(&ctx, &name).await? else {
        return ctx.reply_mention(RECORD_MISSING).await;
    };
    match record.owner {
        Some(owner) => {
            ctx.reply_mention(format!("The owner of **{}** is ``{}``", name, owner))
                .await
        }
        None => ctx.reply_mention(format!("Error: Owner not set for {}", name)).await,
    }
}

pub async fn resolver(ctx: InvocationContext) -> CommandResult {
    let Some(name) = ctx.arg(0).map(str::to_string) else {
        return usage(&ctx, "resolver <name>").await;
    };
    let Some(record) = fetch(&ctx, &name).await? else {
        return ctx.reply_mention(RECORD_MISSING).await;
    };
    match record.resolver {
        Some(resolver) => {
            ctx.reply_mention(format!("The resolver of **{}** is ``{}``", name, resolver))
                .await
        }
        None => {
            ctx.reply_mention(format!("Error: Resolver not set for {}", name))
                .await
        }
    }
}

/// General information about a name. Addresses are looked up through their
/// reverse record, `<hex>.addr.reverse`.
pub async fn info(ctx: InvocationContext) -> CommandResult {
    let Some(input) = ctx.arg(0).map(str::to_string) else {
        return usage(&ctx, "info <name>").await;
    };
    let name = match chain::to_hex_address(network(&ctx).await, &input) {
        Ok(hex) => format!("{}.addr.reverse", hex),
        Err(_) if chain::is_hex_address(&input) => {
            format!("{}.addr.reverse", input.trim_start_matches("0x").to_lowercase())
        }
        Err(_) => input.to_lowercase(),
    };

    let Some(record) = fetch(&ctx, &name).await? else {
        return ctx
            .reply(format!("Error: The MNS name `{}` does not exist.", input))
            .await;
    };
    let Some(owner) = record.owner else {
        return ctx.reply(format!("Error: Owner not set for {}", input)).await;
    };
    let Some(resolver) = record.resolver else {
        return ctx.reply(format!("Error: Resolver not set for {}", input)).await;
    };

    let (label, parent) = match name.split_once('.') {
        Some((label, parent)) => (label, parent),
        None => (name.as_str(), ZERO_HASH),
    };
    ctx.reply(format!(
        "**MNS Name Info**\nName: {}\nLabel: {}\nParent: {}\nOwner: {}\nResolver: {}\nTTL: {}\nMNS App: {}/{}",
        name,
        label,
        parent,
        owner,
        resolver,
        record.ttl.unwrap_or(0),
        APP_URL,
        name
    ))
    .await
}

pub async fn addr(ctx: InvocationContext) -> CommandResult {
    let Some(name) = ctx.arg(0).map(str::to_string) else {
        return usage(&ctx, "addr <name> [coin]").await;
    };
    let coin = ctx.arg(1).unwrap_or(DEFAULT_COIN).to_uppercase();
    let Some(record) = profile_record(&ctx, &name).await? else {
        return Ok(());
    };
    match record.address(&coin) {
        Some(address) => {
            ctx.reply_mention(format!(
                "The {} address of **{}** is ``{}``",
                coin, name, address
            ))
            .await
        }
        None => {
            ctx.reply_mention(format!("Error: {} address not set for {}", coin, name))
                .await
        }
    }
}

pub async fn text(ctx: InvocationContext) -> CommandResult {
    let (Some(name), Some(key)) = (ctx.arg(0).map(str::to_string), ctx.arg(1).map(str::to_string)) else {
        return usage(&ctx, "text <name> <key>").await;
    };
    let Some(record) = profile_record(&ctx, &name).await? else {
        return Ok(());
    };
    match record.text.get(&key) {
        Some(value) => {
            ctx.reply_mention(format!("The `{}` text record of **{}** is ``{}``", key, name, value))
                .await
        }
        None => {
            ctx.reply_mention(format!("Error: Text record `{}` not set for {}", key, name))
                .await
        }
    }
}

pub async fn name(ctx: InvocationContext) -> CommandResult {
    let Some(name) = ctx.arg(0).map(str::to_string) else {
        return usage(&ctx, "name <name>").await;
    };
    let Some(record) = profile_record(&ctx, &name).await? else {
        return Ok(());
    };
    match record.name.filter(|n| !n.is_empty()) {
        Some(n) => {
            ctx.reply_mention(format!("The name for **{}** is ``{}``", name, n))
                .await
        }
        None => ctx.reply_mention(format!("Error: Name not set for {}", name)).await,
    }
}

pub async fn pubkey(ctx: InvocationContext) -> CommandResult {
    let Some(name) = ctx.arg(0).map(str::to_string) else {
        return usage(&ctx, "pubkey <name>").await;
    };
    let Some(record) = profile_record(&ctx, &name).await? else {
        return Ok(());
    };
    match record.pubkey.filter(|key| !(is_zero_word(&key.x) && is_zero_word(&key.y))) {
        Some(key) => {
            ctx.reply_mention(format!(
                "The pubkey for **{}** is ```\nx:{}\ny:{}\n```",
                name, key.x, key.y
            ))
            .await
        }
        None => ctx.reply_mention(format!("Error: Pubkey not set for {}", name)).await,
    }
}

pub async fn contenthash(ctx: InvocationContext) -> CommandResult {
    let Some(name) = ctx.arg(0).map(str::to_string) else {
        return usage(&ctx, "contenthash <name>").await;
    };
    let Some(record) = profile_record(&ctx, &name).await? else {
        return Ok(());
    };
    match record.contenthash.filter(|hash| !is_zero_word(hash)) {
        Some(hash) => {
            ctx.reply_mention(format!("The contenthash for **{}** is ``{}``", name, hash))
                .await
        }
        None => {
            ctx.reply_mention(format!("Error: Contenthash not set for {}", name))
                .await
        }
    }
}

pub async fn interface(ctx: InvocationContext) -> CommandResult {
    let (Some(name), Some(id)) = (ctx.arg(0).map(str::to_string), ctx.arg(1).map(str::to_string)) else {
        return usage(&ctx, "interface <name> <interface id>").await;
    };
    if !is_interface_id(&id) {
        return ctx
            .reply_mention(format!("Error: Invalid interface id '{}'", id))
            .await;
    }
    let Some(record) = profile_record(&ctx, &name).await? else {
        return Ok(());
    };
    match record.interface(&id) {
        Some(implementer) => {
            ctx.reply_mention(format!(
                "The implementer of interface ``{}`` for **{}** is ``{}``",
                id, name, implementer
            ))
            .await
        }
        None => {
            ctx.reply_mention(format!("Error: Interface ``{}`` not implemented for {}", id, name))
                .await
        }
    }
}

pub async fn abi(ctx: InvocationContext) -> CommandResult {
    let (Some(name), Some(raw_type)) = (ctx.arg(0).map(str::to_string), ctx.arg(1).map(str::to_string)) else {
        return usage(&ctx, "abi <name> <1|2|4|8>").await;
    };
    let Some((content_type, encoding)) = raw_type
        .parse::<u32>()
        .ok()
        .and_then(|t| ABI_ENCODINGS.iter().copied().find(|(code, _)| *code == t))
    else {
        return ctx
            .reply_mention(format!("Error: Invalid encoding type '{}'", raw_type))
            .await;
    };
    let Some(record) = profile_record(&ctx, &name).await? else {
        return Ok(());
    };
    let Some(data) = record.abi(content_type).filter(|data| !data.is_empty() && *data != "0x") else {
        return ctx
            .reply_mention(format!("Error: ABI Content not set for {}", name))
            .await;
    };

    let (lang, body) = match serde_json::from_str::<serde_json::Value>(data) {
        Ok(json) if content_type == 1 => (
            "json",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| data.to_string()),
        ),
        _ => ("", data.to_string()),
    };
    ctx.reply_mention(format!(
        "here is the ABI you requested for {}. It should be in {} format.\n```{}\n{}\n```",
        name,
        encoding,
        lang,
        preview(&body, ABI_PREVIEW_CHARS)
    ))
    .await
}

pub async fn dns(ctx: InvocationContext) -> CommandResult {
    let (Some(name), Some(owner), Some(raw_type)) = (
        ctx.arg(0).map(str::to_string),
        ctx.arg(1).map(str::to_string),
        ctx.arg(2).map(str::to_string),
    ) else {
        return usage(&ctx, "dns <name> <dns name> <record type>").await;
    };
    let Some((mnemonic, code)) = dns_record_type(&raw_type) else {
        return ctx
            .reply_mention(format!("Error: Invalid DNS record type '{}'", raw_type))
            .await;
    };
    let Some(record) = profile_record(&ctx, &name).await? else {
        return Ok(());
    };
    match record.dns_record(&owner, mnemonic, code) {
        Some(value) => {
            ctx.reply_mention(format!(
                "The {} record for ``{}`` on **{}** is ``{}``",
                mnemonic, owner, name, value
            ))
            .await
        }
        None => {
            ctx.reply_mention(format!("Error: No {} record for {} on {}", mnemonic, owner, name))
                .await
        }
    }
}

// ============================================================================
// UTILITY FUNCTIONS
// ============================================================================

async fn usage(ctx: &InvocationContext, usage: &str) -> CommandResult {
    let prefix = invocation_prefix(ctx).await;
    ctx.reply_mention(format!("Usage: `{}{}`", prefix, usage)).await
}

async fn fetch(ctx: &InvocationContext, name: &str) -> Result<Option<NameRecord>, HandlerError> {
    let resolver: Arc<dyn NameResolver> = {
        let data = ctx.data.read().await;
        data.get::<ResolverKey>()
            .cloned()
            .ok_or_else(|| HandlerError::Internal("name resolver not configured".to_string()))?
    };
    log::debug!("[MNS] {} looking up {}", ctx.caller, name);
    Ok(resolver.lookup(name).await?)
}

/// Fetch a record whose resolver profile is about to be read. Replies with
/// the matching error and yields `None` when the record is missing or has no
/// resolver.
async fn profile_record(ctx: &InvocationContext, name: &str) -> Result<Option<NameRecord>, HandlerError> {
    let Some(record) = fetch(ctx, name).await? else {
        ctx.reply_mention(RECORD_MISSING).await?;
        return Ok(None);
    };
    if record.resolver.is_none() {
        ctx.reply_mention(NO_RESOLVER).await?;
        return Ok(None);
    }
    Ok(Some(record))
}

/// Empty, `0x` or all-zero hex words count as unset.
fn is_zero_word(value: &str) -> bool {
    value.trim_start_matches("0x").chars().all(|c| c == '0')
}

fn is_interface_id(id: &str) -> bool {
    id.strip_prefix("0x")
        .is_some_and(|digits| digits.len() == 8 && digits.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Resolve a DNS record type given as a mnemonic (`MX`, `any`) or a number.
fn dns_record_type(raw: &str) -> Option<(&'static str, u16)> {
    let raw = if raw.eq_ignore_ascii_case("any") { "*" } else { raw };
    match raw.parse::<u16>() {
        Ok(code) => DNS_RECORD_TYPES.iter().copied().find(|(_, c)| *c == code),
        Err(_) => DNS_RECORD_TYPES
            .iter()
            .copied()
            .find(|(mnemonic, _)| mnemonic.eq_ignore_ascii_case(raw)),
    }
}

fn preview(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let mut cut: String = body.chars().take(max_chars).collect();
    cut.push_str("\n...");
    cut
}
