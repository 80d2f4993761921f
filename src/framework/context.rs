// context.rs - Invocation Context
// One inbound request, normalized so that handlers never need to know whether
// it arrived as a prefixed text message or as a slash interaction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serenity::prelude::{RwLock, TypeMap};

use crate::framework::outbound::Outbound;
use crate::framework::HandlerError;

/// Where an invocation came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationSource {
    /// Legacy prefix path: the full inbound line.
    Message { text: String },
    /// Structured path: option name/value pairs in declared order.
    Interaction { options: Vec<(String, String)> },
}

/// Normalized per-request context handed to a command handler.
#[derive(Clone)]
pub struct InvocationContext {
    /// Opaque id of the invoking user.
    pub caller: String,
    /// Opaque id of the channel/conversation the request arrived on.
    pub origin: String,
    pub source: InvocationSource,
    /// Prefix-stripped first token, or the declared slash command name.
    pub command_token: String,
    /// Remaining tokens (legacy) or option values (structured), in order.
    pub args: Vec<String>,
    /// Whether the caller is in the configured admin set.
    pub is_admin: bool,
    /// Shared process data (resolver, registry handle, shutdown trigger...).
    pub data: Arc<RwLock<TypeMap>>,
    out: Arc<dyn Outbound>,
    // Shared by every clone so the dispatcher sees replies made in the handler.
    replied: Arc<AtomicBool>,
}

impl InvocationContext {
    pub fn new(
        caller: impl Into<String>,
        origin: impl Into<String>,
        source: InvocationSource,
        command_token: impl Into<String>,
        args: Vec<String>,
        data: Arc<RwLock<TypeMap>>,
        out: Arc<dyn Outbound>,
    ) -> Self {
        Self {
            caller: caller.into(),
            origin: origin.into(),
            source,
            command_token: command_token.into(),
            args,
            is_admin: false,
            data,
            out,
            replied: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The full raw text for legacy invocations, or the option values joined
    /// by spaces for structured ones.
    pub fn raw_text(&self) -> String {
        match &self.source {
            InvocationSource::Message { text } => text.clone(),
            InvocationSource::Interaction { options } => options
                .iter()
                .map(|(_, value)| value.as_str())
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Send a reply back to the origin of this invocation.
    pub async fn reply(&self, content: impl AsRef<str>) -> Result<(), HandlerError> {
        self.out.send(&self.origin, content.as_ref()).await?;
        self.replied.store(true, Ordering::Release);
        Ok(())
    }

    /// Whether any reply from this invocation has been delivered.
    pub fn has_replied(&self) -> bool {
        self.replied.load(Ordering::Acquire)
    }

    pub fn is_interaction(&self) -> bool {
        matches!(self.source, InvocationSource::Interaction { .. })
    }

    /// Like `reply`, but prefixed with a mention of the caller.
    pub async fn reply_mention(&self, content: impl AsRef<str>) -> Result<(), HandlerError> {
        let text = format!("<@{}> {}", self.caller, content.as_ref());
        self.reply(text).await
    }

    pub(crate) fn outbound(&self) -> &Arc<dyn Outbound> {
        &self.out
    }
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("caller", &self.caller)
            .field("origin", &self.origin)
            .field("command_token", &self.command_token)
            .field("args", &self.args)
            .finish()
    }
}
