// error.rs - Framework error types

use thiserror::Error;

use crate::framework::outbound::SendError;
use crate::resolver::ResolverError;

/// Registration-time failures. All are fatal to start-up.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A name or alias already maps to another command (case-insensitive).
    #[error("duplicate command token: {0}")]
    DuplicateCommand(String),

    /// A command was declared with a blank name or alias.
    #[error("command '{0}' declares an empty name or alias")]
    EmptyToken(String),

    /// Configuration referenced a command that was never registered.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// Failures raised by a command's own execution. Caught at the dispatch
/// boundary and reported to the caller as a generic notice.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("send failed: {0}")]
    Send(#[from] SendError),

    #[error("resolver error: {0}")]
    Resolver(#[from] ResolverError),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Static label used in log lines.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Send(_) => "send_error",
            Self::Resolver(_) => "resolver_error",
            Self::Panicked(_) => "panic",
            Self::Internal(_) => "internal_error",
        }
    }
}

pub type CommandResult = Result<(), HandlerError>;
