// framework/mod.rs - Command dispatch engine
// Registry, authorization, cooldowns and the dispatcher that ties them
// together. Nothing in here handles gateway events or calls the Discord API;
// the only serenity items used are the TypeMap/RwLock pair that carries shared
// handler data. The serenity glue lives in discord.rs and talks to this module
// through MessageEvent, StructuredEvent and the Outbound trait.

pub mod auth;
pub mod clock;
pub mod context;
pub mod cooldown;
pub mod dispatcher;
pub mod error;
pub mod outbound;
pub mod registry;

pub use auth::AuthorizationPolicy;
pub use context::InvocationContext;
pub use dispatcher::{
    DispatchOutcome, Dispatcher, DispatcherConfig, MessageEvent, NoticePolicy, StructuredEvent,
};
pub use error::{CommandResult, HandlerError, RegistryError};
pub use outbound::{Outbound, SendError};
pub use registry::{Command, Privilege, Registry};
