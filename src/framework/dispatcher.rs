// dispatcher.rs - Message / Interaction Router
// The single entry point that turns one inbound event into zero or one handler
// execution:
//
//   Received -> Tokenized -> Resolved -> AuthorizationChecked -> CooldownChecked
//            -> Executing -> Completed | Failed
//
// Every early exit lands in Ignored or Rejected without running the handler.
// Handler failures (errors and panics) stop here: they are logged, the caller
// gets a generic notice, and nothing else is affected.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use once_cell::sync::OnceCell;
use serenity::prelude::{RwLock, TypeMap};

use crate::framework::auth::{Authorization, AuthorizationPolicy};
use crate::framework::clock::{Clock, SystemClock};
use crate::framework::context::{InvocationContext, InvocationSource};
use crate::framework::cooldown::{Cooldown, CooldownTracker};
use crate::framework::error::HandlerError;
use crate::framework::outbound::Outbound;
use crate::framework::registry::{Command, Registry};

/// Inbound text message from the chat platform.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    pub channel_id: String,
    pub author_id: String,
    pub text: String,
}

/// Inbound structured (slash) command.
#[derive(Debug, Clone)]
pub struct StructuredEvent {
    pub command_name: String,
    /// Option name/value pairs, in declared order.
    pub options: Vec<(String, String)>,
    pub caller_id: String,
    pub channel_id: String,
}

/// Which early rejections get a reply instead of silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoticePolicy {
    /// Reply to prefixed tokens that resolve to nothing (legacy path).
    pub unknown_command: bool,
    /// Reply when a disabled command is invoked (both paths).
    pub disabled_command: bool,
}

impl Default for NoticePolicy {
    fn default() -> Self {
        Self {
            unknown_command: false,
            disabled_command: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub prefix: String,
    pub cooldown_window: Duration,
    pub notices: NoticePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OwnMessage,
    NotACommand,
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Disabled,
    NotAuthorized,
    CooldownActive { retry_at: u64 },
}

/// Terminal state of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    Rejected(Rejection),
    Completed,
    Failed,
}

pub const INTERNAL_ERROR_NOTICE: &str = "Error: An internal error occurred";

/// Sent on the slash path when a handler finishes without replying, so the
/// deferred interaction does not stay in the "thinking" state.
pub const SILENT_COMPLETION_NOTICE: &str = "✅ Done.";

pub struct Dispatcher {
    registry: Arc<Registry>,
    policy: AuthorizationPolicy,
    cooldowns: CooldownTracker,
    config: DispatcherConfig,
    clock: Arc<dyn Clock>,
    outbound: Arc<dyn Outbound>,
    data: Arc<RwLock<TypeMap>>,
    self_id: OnceCell<String>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        policy: AuthorizationPolicy,
        config: DispatcherConfig,
        outbound: Arc<dyn Outbound>,
        data: Arc<RwLock<TypeMap>>,
    ) -> Self {
        Self::with_clock(registry, policy, config, outbound, data, Arc::new(SystemClock))
    }

    pub fn with_clock(
        registry: Arc<Registry>,
        policy: AuthorizationPolicy,
        config: DispatcherConfig,
        outbound: Arc<dyn Outbound>,
        data: Arc<RwLock<TypeMap>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            policy,
            cooldowns: CooldownTracker::new(),
            config,
            clock,
            outbound,
            data,
            self_id: OnceCell::new(),
        }
    }

    /// Record the bot's own user id once the gateway reports it.
    pub fn set_self_id(&self, id: impl Into<String>) {
        let id = id.into();
        if self.self_id.set(id.clone()).is_err() {
            log::debug!("[DISPATCH] Self id already set, ignoring {}", id);
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn prefix(&self) -> &str {
        &self.config.prefix
    }

    /// Split a line into `(command_token, args)` if its first token carries
    /// the prefix. A bare prefix is not a command.
    pub fn tokenize(&self, text: &str) -> Option<(String, Vec<String>)> {
        let mut tokens = text.split_whitespace();
        let token = tokens.next()?.strip_prefix(self.config.prefix.as_str())?;
        if token.is_empty() {
            return None;
        }
        Some((token.to_string(), tokens.map(str::to_string).collect()))
    }

    /// Legacy prefix path.
    pub async fn handle_message(&self, event: MessageEvent) -> DispatchOutcome {
        if self.self_id.get() == Some(&event.author_id) {
            return DispatchOutcome::Ignored(IgnoreReason::OwnMessage);
        }

        let Some((token, args)) = self.tokenize(&event.text) else {
            return DispatchOutcome::Ignored(IgnoreReason::NotACommand);
        };

        let ctx = InvocationContext::new(
            event.author_id,
            event.channel_id,
            InvocationSource::Message { text: event.text },
            token,
            args,
            Arc::clone(&self.data),
            Arc::clone(&self.outbound),
        );

        let Some(command) = self.registry.resolve(&ctx.command_token) else {
            log::debug!(
                "[DISPATCH] Unrecognised command '{}' from user {}: {:?}",
                ctx.command_token,
                ctx.caller,
                ctx.raw_text()
            );
            if self.config.notices.unknown_command {
                let notice = format!(
                    "Unknown command `{}`. Use `{}help` to see available commands.",
                    ctx.command_token, self.config.prefix
                );
                self.notify(&ctx, &notice).await;
            }
            return DispatchOutcome::Ignored(IgnoreReason::Unresolved);
        };

        self.admit_and_execute(command, ctx).await
    }

    /// Structured (slash) path. Replies go through `out`, which is bound to
    /// the interaction rather than to the channel.
    pub async fn handle_interaction(&self, event: StructuredEvent, out: Arc<dyn Outbound>) -> DispatchOutcome {
        let args = event.options.iter().map(|(_, value)| value.clone()).collect();
        let ctx = InvocationContext::new(
            event.caller_id,
            event.channel_id,
            InvocationSource::Interaction { options: event.options },
            event.command_name,
            args,
            Arc::clone(&self.data),
            out,
        );

        let Some(command) = self.registry.get(&ctx.command_token) else {
            log::warn!("[DISPATCH] Slash command '{}' is not registered", ctx.command_token);
            // The deferred interaction still needs an answer.
            let notice = format!("Unknown slash command: {}", ctx.command_token);
            self.notify(&ctx, &notice).await;
            return DispatchOutcome::Ignored(IgnoreReason::Unresolved);
        };

        self.admit_and_execute(command, ctx).await
    }

    async fn admit_and_execute(&self, command: Arc<Command>, mut ctx: InvocationContext) -> DispatchOutcome {
        if !command.is_enabled() {
            log::debug!("[DISPATCH] '{}' is disabled, refusing {}", command.name(), ctx.caller);
            if self.config.notices.disabled_command {
                let notice = format!("The `{}` command is currently disabled.", command.name());
                self.notify(&ctx, &notice).await;
            }
            return DispatchOutcome::Rejected(Rejection::Disabled);
        }

        if let Authorization::Denied(reason) = self.policy.authorize(&command, &ctx.caller) {
            log::debug!(
                "[DISPATCH] '{}' denied for {}: {:?}",
                command.name(),
                ctx.caller,
                reason
            );
            let notice = format!(
                "<@{}> ❌ **Access Denied**\nThis command can only be used by bot administrators.",
                ctx.caller
            );
            self.notify(&ctx, &notice).await;
            return DispatchOutcome::Rejected(Rejection::NotAuthorized);
        }

        let window = command.cooldown_override().unwrap_or(self.config.cooldown_window);
        let window_millis = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        let now = self.clock.now_millis();
        if let Cooldown::Denied { retry_at } =
            self.cooldowns
                .check_and_record(command.name(), &ctx.caller, now, window_millis)
        {
            log::debug!(
                "[DISPATCH] '{}' on cooldown for {} until {}",
                command.name(),
                ctx.caller,
                retry_at
            );
            let notice = cooldown_notice(&ctx.caller, command.name(), now, retry_at);
            self.notify(&ctx, &notice).await;
            return DispatchOutcome::Rejected(Rejection::CooldownActive { retry_at });
        }

        ctx.is_admin = self.policy.is_admin(&ctx.caller);
        self.execute(&command, ctx).await
    }

    async fn execute(&self, command: &Command, ctx: InvocationContext) -> DispatchOutcome {
        let handler = command.handler();
        let result = AssertUnwindSafe(handler(ctx.clone())).catch_unwind().await;

        let err = match result {
            Ok(Ok(())) => {
                log::debug!("[DISPATCH] '{}' completed for {}", command.name(), ctx.caller);
                if ctx.is_interaction() && !ctx.has_replied() {
                    self.notify(&ctx, SILENT_COMPLETION_NOTICE).await;
                }
                return DispatchOutcome::Completed;
            }
            Ok(Err(err)) => err,
            Err(panic) => HandlerError::Panicked(panic_message(panic.as_ref())),
        };

        log::error!(
            "[DISPATCH] Command '{}' failed for user {} in {} (args: {:?}) [{}]: {}",
            command.name(),
            ctx.caller,
            ctx.origin,
            ctx.args,
            err.error_code(),
            err
        );
        let notice = format!("<@{}> {}", ctx.caller, INTERNAL_ERROR_NOTICE);
        self.notify(&ctx, &notice).await;
        DispatchOutcome::Failed
    }

    /// Best-effort reply; delivery failures are logged and swallowed.
    async fn notify(&self, ctx: &InvocationContext, content: &str) {
        if let Err(e) = ctx.outbound().send(&ctx.origin, content).await {
            log::warn!("[DISPATCH] Failed to deliver notice to {}: {}", ctx.origin, e);
        }
    }
}

fn cooldown_notice(caller: &str, command: &str, now: u64, retry_at: u64) -> String {
    let wait_ms = retry_at.saturating_sub(now);
    let wait_secs = wait_ms.div_ceil(1000);
    format!(
        "<@{}> ⏳ `{}` is on cooldown. Try again in {}s (<t:{}:T>).",
        caller,
        command,
        wait_secs,
        retry_at.div_ceil(1000)
    )
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::clock::testing::ManualClock;
    use crate::framework::outbound::testing::RecordingOutbound;
    use crate::framework::registry::Privilege;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    struct Harness {
        dispatcher: Arc<Dispatcher>,
        out: Arc<RecordingOutbound>,
        clock: Arc<ManualClock>,
    }

    fn config() -> DispatcherConfig {
        DispatcherConfig {
            prefix: "^".to_string(),
            cooldown_window: Duration::from_millis(10_000),
            notices: NoticePolicy::default(),
        }
    }

    fn harness_with(registry: Registry, admins: &[&str], config: DispatcherConfig) -> Harness {
        let out = Arc::new(RecordingOutbound::default());
        let clock = Arc::new(ManualClock::at(0));
        let dispatcher = Dispatcher::with_clock(
            Arc::new(registry),
            AuthorizationPolicy::new(admins.iter().copied()),
            config,
            out.clone(),
            Arc::new(RwLock::new(TypeMap::new())),
            clock.clone(),
        );
        dispatcher.set_self_id("bot");
        Harness {
            dispatcher: Arc::new(dispatcher),
            out,
            clock,
        }
    }

    fn harness(registry: Registry, admins: &[&str]) -> Harness {
        harness_with(registry, admins, config())
    }

    fn counting(name: &str, counter: &Arc<AtomicUsize>) -> Command {
        let counter = Arc::clone(counter);
        Command::new(name, move |ctx: InvocationContext| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                ctx.reply("pong!").await
            }
        })
    }

    fn msg(author: &str, text: &str) -> MessageEvent {
        MessageEvent {
            channel_id: "c1".to_string(),
            author_id: author.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_tokenize() {
        let h = harness(Registry::new(), &[]);
        let d = &h.dispatcher;
        assert_eq!(
            d.tokenize("^text  alice.mrx   url"),
            Some(("text".to_string(), vec!["alice.mrx".to_string(), "url".to_string()]))
        );
        assert_eq!(d.tokenize("  ^ping"), Some(("ping".to_string(), vec![])));
        assert_eq!(d.tokenize("^"), None);
        assert_eq!(d.tokenize("^ ping"), None);
        assert_eq!(d.tokenize("ping ^ping"), None);
        assert_eq!(d.tokenize(""), None);
    }

    #[tokio::test]
    async fn test_ignores_own_and_non_command_messages() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry.register(counting("ping", &runs)).unwrap();
        let h = harness(registry, &[]);

        assert_eq!(
            h.dispatcher.handle_message(msg("bot", "^ping")).await,
            DispatchOutcome::Ignored(IgnoreReason::OwnMessage)
        );
        assert_eq!(
            h.dispatcher.handle_message(msg("u1", "hello there")).await,
            DispatchOutcome::Ignored(IgnoreReason::NotACommand)
        );
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(h.out.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command_is_silent_by_default() {
        let h = harness(Registry::new(), &[]);
        assert_eq!(
            h.dispatcher.handle_message(msg("u1", "^nope")).await,
            DispatchOutcome::Ignored(IgnoreReason::Unresolved)
        );
        assert!(h.out.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_command_notice_when_enabled() {
        let mut cfg = config();
        cfg.notices.unknown_command = true;
        let h = harness_with(Registry::new(), &[], cfg);

        assert_eq!(
            h.dispatcher.handle_message(msg("u1", "^nope")).await,
            DispatchOutcome::Ignored(IgnoreReason::Unresolved)
        );
        let sent = h.out.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "c1");
        assert!(sent[0].1.contains("Unknown command `nope`"));
        assert!(sent[0].1.contains("^help"));
    }

    #[tokio::test]
    async fn test_alias_and_case_dispatch_to_same_command() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry
            .register(counting("text", &runs).aliases(["txt"]).cooldown(Duration::ZERO))
            .unwrap();
        let h = harness(registry, &[]);

        for line in ["^text a b", "^TXT a b", "^Text"] {
            assert_eq!(h.dispatcher.handle_message(msg("u1", line)).await, DispatchOutcome::Completed);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_handler_receives_normalized_context() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let sink = Arc::clone(&seen);
        let mut registry = Registry::new();
        registry
            .register(Command::new("text", move |ctx: InvocationContext| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock().unwrap() = Some((
                        ctx.caller.clone(),
                        ctx.origin.clone(),
                        ctx.command_token.clone(),
                        ctx.args.clone(),
                        ctx.raw_text(),
                    ));
                    Ok(())
                }
            }).aliases(["txt"]))
            .unwrap();
        let h = harness(registry, &[]);

        h.dispatcher.handle_message(msg("u1", "^txt alice.mrx url")).await;
        let (caller, origin, token, args, raw) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(caller, "u1");
        assert_eq!(origin, "c1");
        assert_eq!(token, "txt");
        assert_eq!(args, vec!["alice.mrx", "url"]);
        assert_eq!(raw, "^txt alice.mrx url");
    }

    #[tokio::test]
    async fn test_disabled_command_refuses_and_reenables() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry.register(counting("ping", &runs).cooldown(Duration::ZERO)).unwrap();
        let h = harness(registry, &[]);

        h.dispatcher.registry().set_enabled("ping", false).unwrap();
        assert!(h.dispatcher.registry().resolve("ping").is_some());
        assert_eq!(
            h.dispatcher.handle_message(msg("u1", "^ping")).await,
            DispatchOutcome::Rejected(Rejection::Disabled)
        );
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(h.out.contents(), vec!["The `ping` command is currently disabled."]);
        // refusing does not consume a cooldown slot
        assert!(h.dispatcher.cooldowns().is_empty());

        h.dispatcher.registry().set_enabled("ping", true).unwrap();
        assert_eq!(h.dispatcher.handle_message(msg("u1", "^ping")).await, DispatchOutcome::Completed);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_command_silent_when_notice_off() {
        let mut cfg = config();
        cfg.notices.disabled_command = false;
        let mut registry = Registry::new();
        registry.register(Command::new("ping", |_ctx| async { Ok(()) })).unwrap();
        registry.set_enabled("ping", false).unwrap();
        let h = harness_with(registry, &[], cfg);

        assert_eq!(
            h.dispatcher.handle_message(msg("u1", "^ping")).await,
            DispatchOutcome::Rejected(Rejection::Disabled)
        );
        assert!(h.out.sent().is_empty());
    }

    #[tokio::test]
    async fn test_ping_cooldown_scenario() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry.register(counting("ping", &runs)).unwrap();
        let h = harness(registry, &[]);

        h.clock.set(0);
        assert_eq!(h.dispatcher.handle_message(msg("u1", "^ping")).await, DispatchOutcome::Completed);
        assert_eq!(h.dispatcher.cooldowns().last_seen("ping", "u1"), Some(0));

        h.clock.set(5_000);
        assert_eq!(
            h.dispatcher.handle_message(msg("u1", "^ping")).await,
            DispatchOutcome::Rejected(Rejection::CooldownActive { retry_at: 10_000 })
        );
        assert_eq!(
            h.dispatcher.handle_message(msg("u2", "^ping")).await,
            DispatchOutcome::Completed
        );
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        let contents = h.out.contents();
        assert_eq!(contents.len(), 3);
        assert!(contents[1].contains("<@u1>"));
        assert!(contents[1].contains("Try again in 5s"));
        assert!(contents[1].contains("<t:10:T>"));
    }

    #[tokio::test]
    async fn test_per_command_cooldown_override() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry
            .register(counting("ping", &runs).cooldown(Duration::from_millis(100)))
            .unwrap();
        let h = harness(registry, &[]);

        h.clock.set(1_000);
        assert_eq!(h.dispatcher.handle_message(msg("u1", "^ping")).await, DispatchOutcome::Completed);
        h.clock.set(1_099);
        assert_eq!(
            h.dispatcher.handle_message(msg("u1", "^ping")).await,
            DispatchOutcome::Rejected(Rejection::CooldownActive { retry_at: 1_100 })
        );
        h.clock.set(1_100);
        assert_eq!(h.dispatcher.handle_message(msg("u1", "^ping")).await, DispatchOutcome::Completed);
    }

    #[tokio::test]
    async fn test_shutdown_admin_scenario() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry
            .register(counting("shutdown", &runs).privilege(Privilege::Admin))
            .unwrap();
        let h = harness(registry, &["a1"]);

        assert_eq!(
            h.dispatcher.handle_message(msg("u1", "^shutdown")).await,
            DispatchOutcome::Rejected(Rejection::NotAuthorized)
        );
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(h.dispatcher.cooldowns().last_seen("shutdown", "u1"), None);
        assert!(h.out.contents()[0].contains("Access Denied"));

        assert_eq!(h.dispatcher.handle_message(msg("a1", "^shutdown")).await, DispatchOutcome::Completed);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_admin_flag_visible_to_handler() {
        let flags = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&flags);
        let mut registry = Registry::new();
        registry
            .register(
                Command::new("help", move |ctx: InvocationContext| {
                    let sink = Arc::clone(&sink);
                    async move {
                        sink.lock().unwrap().push(ctx.is_admin);
                        Ok(())
                    }
                })
                .cooldown(Duration::ZERO),
            )
            .unwrap();
        let h = harness(registry, &["a1"]);

        h.dispatcher.handle_message(msg("u1", "^help")).await;
        h.dispatcher.handle_message(msg("a1", "^help")).await;
        assert_eq!(*flags.lock().unwrap(), vec![false, true]);
    }

    #[tokio::test]
    async fn test_handler_error_is_isolated() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry
            .register(Command::new("addr", |_ctx| async {
                Err(HandlerError::Internal("resolver exploded: secret detail".to_string()))
            }))
            .unwrap();
        registry.register(counting("ping", &runs)).unwrap();
        let h = harness(registry, &[]);

        assert_eq!(
            h.dispatcher.handle_message(msg("u1", "^addr alice.mrx")).await,
            DispatchOutcome::Failed
        );
        assert_eq!(h.out.contents(), vec![format!("<@u1> {}", INTERNAL_ERROR_NOTICE)]);

        assert_eq!(h.dispatcher.handle_message(msg("u2", "^ping")).await, DispatchOutcome::Completed);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!h.out.contents().iter().any(|c| c.contains("secret detail")));
    }

    #[tokio::test]
    async fn test_handler_panic_is_isolated() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry
            .register(Command::new("boom", |_ctx| async {
                if true {
                    panic!("handler blew up");
                }
                Ok(())
            }))
            .unwrap();
        registry.register(counting("ping", &runs)).unwrap();
        let h = harness(registry, &[]);

        assert_eq!(h.dispatcher.handle_message(msg("u1", "^boom")).await, DispatchOutcome::Failed);
        assert_eq!(h.out.contents().len(), 1);
        assert_eq!(h.dispatcher.handle_message(msg("u2", "^ping")).await, DispatchOutcome::Completed);
    }

    #[tokio::test]
    async fn test_send_failure_is_not_fatal() {
        let out = Arc::new(RecordingOutbound::failing());
        let mut registry = Registry::new();
        registry.register(Command::new("ping", |ctx: InvocationContext| async move {
            ctx.reply("pong!").await
        })).unwrap();
        let dispatcher = Dispatcher::with_clock(
            Arc::new(registry),
            AuthorizationPolicy::default(),
            config(),
            out,
            Arc::new(RwLock::new(TypeMap::new())),
            Arc::new(ManualClock::at(0)),
        );

        // The handler's own reply fails, which is a handler fault; the notice
        // then also fails and is only logged.
        assert_eq!(dispatcher.handle_message(msg("u1", "^ping")).await, DispatchOutcome::Failed);
    }

    #[tokio::test]
    async fn test_hung_handler_does_not_block_others() {
        let release = Arc::new(Notify::new());
        let gate = Arc::clone(&release);
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry
            .register(Command::new("slow", move |_ctx| {
                let gate = Arc::clone(&gate);
                async move {
                    gate.notified().await;
                    Ok(())
                }
            }))
            .unwrap();
        registry.register(counting("ping", &runs)).unwrap();
        let h = harness(registry, &[]);

        let dispatcher = Arc::clone(&h.dispatcher);
        let slow = tokio::spawn(async move { dispatcher.handle_message(msg("u1", "^slow")).await });

        assert_eq!(h.dispatcher.handle_message(msg("u2", "^ping")).await, DispatchOutcome::Completed);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        release.notify_one();
        assert_eq!(slow.await.unwrap(), DispatchOutcome::Completed);
    }

    #[tokio::test]
    async fn test_structured_path_shares_cooldown_with_legacy() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry.register(counting("ping", &runs)).unwrap();
        let h = harness(registry, &[]);
        let slash_out = Arc::new(RecordingOutbound::default());

        h.clock.set(0);
        assert_eq!(h.dispatcher.handle_message(msg("u1", "^ping")).await, DispatchOutcome::Completed);

        h.clock.set(3_000);
        let event = StructuredEvent {
            command_name: "ping".to_string(),
            options: vec![],
            caller_id: "u1".to_string(),
            channel_id: "c9".to_string(),
        };
        assert_eq!(
            h.dispatcher.handle_interaction(event, slash_out.clone()).await,
            DispatchOutcome::Rejected(Rejection::CooldownActive { retry_at: 10_000 })
        );
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        // the notice went to the interaction, not the channel outbound
        assert_eq!(slash_out.sent().len(), 1);
        assert_eq!(slash_out.sent()[0].0, "c9");
    }

    #[tokio::test]
    async fn test_structured_path_checks_authorization_and_passes_options() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut registry = Registry::new();
        registry
            .register(
                Command::new("text", move |ctx: InvocationContext| {
                    let sink = Arc::clone(&sink);
                    async move {
                        *sink.lock().unwrap() = ctx.args.clone();
                        Ok(())
                    }
                })
                .privilege(Privilege::Admin),
            )
            .unwrap();
        let h = harness(registry, &["a1"]);
        let out = Arc::new(RecordingOutbound::default());

        let event = |caller: &str| StructuredEvent {
            command_name: "text".to_string(),
            options: vec![
                ("name".to_string(), "alice.mrx".to_string()),
                ("key".to_string(), "url".to_string()),
            ],
            caller_id: caller.to_string(),
            channel_id: "c1".to_string(),
        };

        assert_eq!(
            h.dispatcher.handle_interaction(event("u1"), out.clone()).await,
            DispatchOutcome::Rejected(Rejection::NotAuthorized)
        );
        assert!(seen.lock().unwrap().is_empty());

        assert_eq!(h.dispatcher.handle_interaction(event("a1"), out.clone()).await, DispatchOutcome::Completed);
        assert_eq!(*seen.lock().unwrap(), vec!["alice.mrx", "url"]);
    }

    fn slash(name: &str) -> StructuredEvent {
        StructuredEvent {
            command_name: name.to_string(),
            options: vec![],
            caller_id: "u1".to_string(),
            channel_id: "c1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_structured_path_does_not_match_aliases() {
        let runs = Arc::new(AtomicUsize::new(0));
        let mut registry = Registry::new();
        registry.register(counting("text", &runs).aliases(["txt"])).unwrap();
        let h = harness(registry, &[]);
        let out = Arc::new(RecordingOutbound::default());

        assert_eq!(
            h.dispatcher.handle_interaction(slash("txt"), out.clone()).await,
            DispatchOutcome::Ignored(IgnoreReason::Unresolved)
        );
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(out.contents(), vec!["Unknown slash command: txt"]);

        assert_eq!(
            h.dispatcher.handle_interaction(slash("TEXT"), out.clone()).await,
            DispatchOutcome::Completed
        );
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_silent_slash_handler_gets_completion_notice() {
        let mut registry = Registry::new();
        registry.register(Command::new("quiet", |_ctx| async { Ok(()) })).unwrap();
        registry.register(Command::new("loud", |ctx: InvocationContext| async move { ctx.reply("hi").await })).unwrap();
        let h = harness(registry, &[]);
        let out = Arc::new(RecordingOutbound::default());

        assert_eq!(
            h.dispatcher.handle_interaction(slash("quiet"), out.clone()).await,
            DispatchOutcome::Completed
        );
        assert_eq!(out.contents(), vec![SILENT_COMPLETION_NOTICE]);

        assert_eq!(
            h.dispatcher.handle_interaction(slash("loud"), out.clone()).await,
            DispatchOutcome::Completed
        );
        assert_eq!(out.contents(), vec![SILENT_COMPLETION_NOTICE, "hi"]);

        // The legacy path has nothing pending, so silence stays silent.
        h.clock.set(20_000);
        assert_eq!(h.dispatcher.handle_message(msg("u1", "^quiet")).await, DispatchOutcome::Completed);
        assert!(h.out.sent().is_empty());
    }

    #[tokio::test]
    async fn test_structured_unknown_always_answers() {
        let h = harness(Registry::new(), &[]);
        let out = Arc::new(RecordingOutbound::default());
        let event = StructuredEvent {
            command_name: "ghost".to_string(),
            options: vec![],
            caller_id: "u1".to_string(),
            channel_id: "c1".to_string(),
        };
        assert_eq!(
            h.dispatcher.handle_interaction(event, out.clone()).await,
            DispatchOutcome::Ignored(IgnoreReason::Unresolved)
        );
        assert_eq!(out.contents(), vec!["Unknown slash command: ghost"]);
    }
}
