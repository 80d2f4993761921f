// discord.rs - Serenity adapter
// Turns gateway events into dispatcher events and implements Outbound on top
// of the Discord HTTP client. No command logic lives here.

use std::sync::Arc;

use serde_json::Value;
use serenity::{
    async_trait,
    client::{Context, EventHandler},
    http::Http,
    model::{
        application::interaction::{
            application_command::{ApplicationCommandInteraction, CommandDataOption},
            Interaction, InteractionResponseType,
        },
        channel::Message,
        gateway::{Activity, Ready},
        id::ChannelId,
    },
};

use crate::framework::dispatcher::IgnoreReason;
use crate::framework::{
    DispatchOutcome, Dispatcher, MessageEvent, Outbound, SendError, StructuredEvent,
};

/// Sends to a channel by id.
pub struct ChannelOutbound {
    http: Arc<Http>,
}

impl ChannelOutbound {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Outbound for ChannelOutbound {
    async fn send(&self, target: &str, content: &str) -> Result<(), SendError> {
        let id = target
            .parse::<u64>()
            .map_err(|_| SendError::InvalidTarget(target.to_string()))?;
        ChannelId(id)
            .say(&self.http, content)
            .await
            .map(|_| ())
            .map_err(|e| SendError::Platform(e.to_string()))
    }
}

/// Answers a deferred slash interaction through follow-up messages. The
/// target is ignored: replies always belong to the interaction.
pub struct InteractionOutbound {
    http: Arc<Http>,
    token: String,
}

#[async_trait]
impl Outbound for InteractionOutbound {
    async fn send(&self, _target: &str, content: &str) -> Result<(), SendError> {
        self.http
            .create_followup_message(&self.token, &serde_json::json!({ "content": content }))
            .await
            .map(|_| ())
            .map_err(|e| SendError::Platform(e.to_string()))
    }
}

// Event handler implementation
pub struct Handler {
    dispatcher: Arc<Dispatcher>,
    prefix: String,
    default_channel: Option<u64>,
}

impl Handler {
    pub fn new(dispatcher: Arc<Dispatcher>, default_channel: Option<u64>) -> Self {
        let prefix = dispatcher.prefix().to_string();
        Self {
            dispatcher,
            prefix,
            default_channel,
        }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        log::info!("[DISCORD] Bot connected as {}! (ID: {})", ready.user.name, ready.user.id);
        log::info!("[DISCORD] Connected to {} guilds", ready.guilds.len());
        self.dispatcher.set_self_id(ready.user.id.to_string());

        ctx.set_activity(Activity::playing("with the MNS")).await;

        if let Some(channel) = self.default_channel {
            let announcement = format!(
                "Have you heard of the Metrix Name Service?\nYou can do a query in discord, use the ``{}help`` command to learn more.\nCheck out the MNS App at https://metrix.domains/app",
                self.prefix
            );
            if let Err(e) = ChannelId(channel).say(&ctx.http, announcement).await {
                log::warn!("[DISCORD] Failed to post announcement to {}: {}", channel, e);
            }
        }
    }

    async fn message(&self, _ctx: Context, msg: Message) {
        let event = MessageEvent {
            channel_id: msg.channel_id.to_string(),
            author_id: msg.author.id.to_string(),
            text: msg.content,
        };
        let outcome = self.dispatcher.handle_message(event).await;
        if outcome != DispatchOutcome::Ignored(IgnoreReason::NotACommand) {
            log::debug!("[DISCORD] Message from {} -> {:?}", msg.author.id, outcome);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::ApplicationCommand(command) = interaction else {
            return;
        };

        // Acknowledge within Discord's 3 second window; the reply follows.
        if let Err(e) = command
            .create_interaction_response(&ctx.http, |response| {
                response.kind(InteractionResponseType::DeferredChannelMessageWithSource)
            })
            .await
        {
            log::error!("[DISCORD] Failed to acknowledge /{}: {}", command.data.name, e);
            return;
        }

        let out: Arc<dyn Outbound> = Arc::new(InteractionOutbound {
            http: Arc::clone(&ctx.http),
            token: command.token.clone(),
        });
        let outcome = self
            .dispatcher
            .handle_interaction(structured_event(&command), out)
            .await;
        log::debug!("[DISCORD] /{} from {} -> {:?}", command.data.name, command.user.id, outcome);
    }
}

fn structured_event(command: &ApplicationCommandInteraction) -> StructuredEvent {
    let mut options = Vec::new();
    flatten_options(&command.data.options, &mut options);
    StructuredEvent {
        command_name: command.data.name.clone(),
        options,
        caller_id: command.user.id.to_string(),
        channel_id: command.channel_id.to_string(),
    }
}

/// Subcommand groups nest their options; flatten them in declared order.
fn flatten_options(options: &[CommandDataOption], out: &mut Vec<(String, String)>) {
    for option in options {
        if let Some(value) = &option.value {
            out.push((option.name.clone(), option_value(value)));
        }
        flatten_options(&option.options, out);
    }
}

fn option_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
