// registry.rs - Command Registry
// Holds every registered command, resolves invocation tokens (canonical names
// first, then aliases) and carries the runtime enabled flags.
//
// The registry is built mutably during start-up and then shared behind an Arc,
// so its shape can no longer change. Only the enabled flags stay mutable and
// those are atomics.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;

use crate::framework::context::InvocationContext;
use crate::framework::error::{CommandResult, RegistryError};

/// Authorization tier required to run a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Public,
    Admin,
}

/// A command body: a plain async function over the invocation context.
pub type HandlerFn = Arc<dyn Fn(InvocationContext) -> BoxFuture<'static, CommandResult> + Send + Sync>;

/// The unit of registrable behavior.
pub struct Command {
    name: String,
    aliases: Vec<String>,
    usage: String,
    privilege: Privilege,
    cooldown: Option<Duration>,
    enabled: AtomicBool,
    handler: HandlerFn,
}

impl Command {
    /// New public, enabled command with no aliases and no usage text.
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(InvocationContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            usage: String::new(),
            privilege: Privilege::Public,
            cooldown: None,
            enabled: AtomicBool::new(true),
            handler: Arc::new(move |ctx| Box::pin(handler(ctx))),
        }
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn privilege(mut self, privilege: Privilege) -> Self {
        self.privilege = privilege;
        self
    }

    /// Override the global cooldown window for this command only.
    pub fn cooldown(mut self, window: Duration) -> Self {
        self.cooldown = Some(window);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias_list(&self) -> &[String] {
        &self.aliases
    }

    pub fn usage_text(&self) -> &str {
        &self.usage
    }

    pub fn required_privilege(&self) -> Privilege {
        self.privilege
    }

    pub fn cooldown_override(&self) -> Option<Duration> {
        self.cooldown
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub(crate) fn handler(&self) -> HandlerFn {
        Arc::clone(&self.handler)
    }

    /// Lowercased name followed by lowercased aliases.
    fn tokens(&self) -> impl Iterator<Item = String> + '_ {
        std::iter::once(&self.name)
            .chain(self.aliases.iter())
            .map(|token| token.to_lowercase())
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("privilege", &self.privilege)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct Registry {
    commands: Vec<Arc<Command>>,
    by_name: HashMap<String, Arc<Command>>,
    by_alias: HashMap<String, Arc<Command>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a command. Fails without touching the registry if its name or any
    /// alias collides with an existing token, or with one of its own tokens.
    pub fn register(&mut self, command: Command) -> Result<Arc<Command>, RegistryError> {
        let mut seen: Vec<String> = Vec::new();
        for token in command.tokens() {
            if token.trim().is_empty() {
                return Err(RegistryError::EmptyToken(command.name.clone()));
            }
            if seen.contains(&token)
                || self.by_name.contains_key(&token)
                || self.by_alias.contains_key(&token)
            {
                return Err(RegistryError::DuplicateCommand(token));
            }
            seen.push(token);
        }

        let command = Arc::new(command);
        let mut tokens = seen.into_iter();
        if let Some(name) = tokens.next() {
            self.by_name.insert(name, Arc::clone(&command));
        }
        for alias in tokens {
            self.by_alias.insert(alias, Arc::clone(&command));
        }
        self.commands.push(Arc::clone(&command));

        log::debug!(
            "[REGISTRY] Registered '{}' (aliases: {:?}, privilege: {:?})",
            command.name,
            command.aliases,
            command.privilege
        );
        Ok(command)
    }

    /// Case-insensitive lookup against canonical names, then aliases.
    pub fn resolve(&self, token: &str) -> Option<Arc<Command>> {
        let token = token.to_lowercase();
        self.by_name
            .get(&token)
            .or_else(|| self.by_alias.get(&token))
            .cloned()
    }

    /// Case-insensitive lookup against canonical names only. Slash commands
    /// are declared under their canonical name, so aliases never apply there.
    pub fn get(&self, name: &str) -> Option<Arc<Command>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Toggle a command by canonical name. Aliases are not accepted here.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        let command = self
            .by_name
            .get(&name.to_lowercase())
            .ok_or_else(|| RegistryError::UnknownCommand(name.to_string()))?;
        command.enabled.store(enabled, Ordering::Release);
        Ok(())
    }

    /// All commands in registration order.
    pub fn list(&self) -> &[Arc<Command>] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
