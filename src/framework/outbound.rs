// outbound.rs - Outbound message delivery
// The narrow interface the dispatcher and handlers use to talk back to the
// chat platform. The serenity-backed implementations live in discord.rs.

use async_trait::async_trait;
use thiserror::Error;

/// Delivery failure reported by the platform.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("invalid target id: {0}")]
    InvalidTarget(String),

    #[error("target {0} is unreachable")]
    Unreachable(String),

    #[error("platform error: {0}")]
    Platform(String),
}

#[async_trait]
pub trait Outbound: Send + Sync {
    /// Deliver `content` to a channel or user.
    async fn send(&self, target: &str, content: &str) -> Result<(), SendError>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Captures every delivered message as `(target, content)`.
    #[derive(Default)]
    pub struct RecordingOutbound {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl RecordingOutbound {
        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn sent(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }

        pub fn contents(&self) -> Vec<String> {
            self.sent().into_iter().map(|(_, content)| content).collect()
        }
    }

    #[async_trait]
    impl Outbound for RecordingOutbound {
        async fn send(&self, target: &str, content: &str) -> Result<(), SendError> {
            if self.fail {
                return Err(SendError::Unreachable(target.to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((target.to_string(), content.to_string()));
            Ok(())
        }
    }
}
