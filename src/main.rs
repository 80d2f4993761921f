mod chain;
mod commands;
mod config;
mod discord;
mod framework;
mod resolver;

use std::process;
use std::sync::Arc;

use serenity::{
    client::Client,
    prelude::{GatewayIntents, RwLock, TypeMap},
};
use tokio::signal;
use tokio::sync::watch;

use crate::commands::{BotSettings, RegistryKey, SettingsKey, ShutdownKey};
use crate::config::BotConfig;
use crate::discord::{ChannelOutbound, Handler};
use crate::framework::{AuthorizationPolicy, Dispatcher, Registry};
use crate::resolver::{NameResolver, ResolverKey, StaticResolver};

// Name records come from NAMES_FILE; a missing file just means every lookup
// reports "Record does not exist".
fn load_resolver(config: &BotConfig) -> Result<StaticResolver, resolver::ResolverError> {
    if !config.names_file.exists() {
        log::warn!(
            "[MAIN] Names file {} not found, starting with an empty record table",
            config.names_file.display()
        );
        return Ok(StaticResolver::default());
    }
    let resolver = StaticResolver::from_path(&config.names_file)?;
    log::info!(
        "[MAIN] Loaded {} name records from {}",
        resolver.len(),
        config.names_file.display()
    );
    Ok(resolver)
}

#[tokio::main]
async fn main() {
    // Configuration is read before the logger so DEBUG can pick the level.
    let config = BotConfig::load();
    let debug = matches!(&config, Ok(config) if config.debug);

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if debug { "debug" } else { "info" }),
    )
    .format_timestamp_secs()
    .init();

    let config = match config {
        Ok(config) => config,
        Err(error) => {
            log::error!("[MAIN] Failed to load configuration: {}", error);
            log::error!("[MAIN] Create a botconfig.txt in the project root with: DISCORD_TOKEN=your_token_here and PREFIX=^");
            process::exit(1);
        }
    };
    match &config.loaded_from {
        Some(path) => log::info!("[CONFIG] Configuration loaded from {}", path.display()),
        None => log::warn!("[CONFIG] No botconfig.txt found (., .., ../.., src/), using environment only"),
    }

    // Registry: built once, frozen behind an Arc from here on.
    let mut registry = Registry::new();
    if let Err(e) = commands::register_all(&mut registry) {
        log::error!("[MAIN] Command registration failed: {}", e);
        process::exit(1);
    }
    if let Err(e) = commands::apply_disabled(&registry, &config.disabled_commands) {
        log::error!("[MAIN] DISABLED_COMMANDS references an unregistered command: {}", e);
        process::exit(1);
    }
    let registry = Arc::new(registry);
    log::info!(
        "[MAIN] Registered {} commands with prefix '{}' on {}",
        registry.len(),
        config.prefix,
        config.network
    );

    let resolver: Arc<dyn NameResolver> = match load_resolver(&config) {
        Ok(resolver) => Arc::new(resolver),
        Err(e) => {
            log::error!("[MAIN] Failed to load {}: {}", config.names_file.display(), e);
            process::exit(1);
        }
    };

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let mut data = TypeMap::new();
    data.insert::<RegistryKey>(Arc::clone(&registry));
    data.insert::<ResolverKey>(resolver);
    data.insert::<ShutdownKey>(shutdown_tx);
    data.insert::<SettingsKey>(BotSettings {
        prefix: config.prefix.clone(),
        cooldown: config.cooldown,
        network: config.network,
    });

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    // The dispatcher needs the client's HTTP handle and the client needs the
    // dispatcher's event handler, so the HTTP client is built first.
    let http = Arc::new(serenity::http::Http::new(&config.token));
    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        AuthorizationPolicy::new(config.admins.iter().cloned()),
        config.dispatcher_config(),
        Arc::new(ChannelOutbound::new(Arc::clone(&http))),
        Arc::new(RwLock::new(data)),
    ));

    let mut client = match Client::builder(&config.token, intents)
        .event_handler(Handler::new(dispatcher, config.default_channel))
        .await
    {
        Ok(client) => client,
        Err(e) => {
            log::error!("[MAIN] Error creating Discord client: {:?}", e);
            process::exit(1);
        }
    };

    let shard_manager = Arc::clone(&client.shard_manager);

    log::info!("[MAIN] Bot is running, press Ctrl+C to stop");
    let exit_code = tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("[MAIN] Received Ctrl+C, stopping bot gracefully...");
            0
        }
        _ = shutdown_rx.changed() => {
            log::info!("[MAIN] Shutdown command received, stopping bot gracefully...");
            0
        }
        result = client.start() => match result {
            Ok(()) => 0,
            Err(why) => {
                log::error!("[MAIN] Client error (check DISCORD_TOKEN): {:?}", why);
                1
            }
        }
    };

    shard_manager.lock().await.shutdown_all().await;
    log::info!("[MAIN] Bot stopped");
    process::exit(exit_code);
}
