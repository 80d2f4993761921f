// cooldown.rs - Cooldown Tracker
// Per (command, caller) timestamp of the last accepted invocation.
//
// check_and_record runs under the DashMap shard lock for its key, so the
// compare and the write are one atomic step: two racing invocations inside the
// window cannot both see "allowed". A denied attempt never touches the stored
// timestamp.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cooldown {
    Allowed,
    /// Earliest timestamp (ms) at which the pair is allowed again.
    Denied { retry_at: u64 },
}

#[derive(Debug, Default)]
pub struct CooldownTracker {
    last_invocation: DashMap<(String, String), u64>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_and_record(&self, command: &str, caller: &str, now: u64, window_millis: u64) -> Cooldown {
        let key = (command.to_lowercase(), caller.to_string());
        match self.last_invocation.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(now);
                Cooldown::Allowed
            }
            Entry::Occupied(mut slot) => {
                let last = *slot.get();
                if now.saturating_sub(last) >= window_millis {
                    slot.insert(now);
                    Cooldown::Allowed
                } else {
                    Cooldown::Denied {
                        retry_at: last.saturating_add(window_millis),
                    }
                }
            }
        }
    }

    /// Stored timestamp for a pair, if any.
    pub fn last_seen(&self, command: &str, caller: &str) -> Option<u64> {
        self.last_invocation
            .get(&(command.to_lowercase(), caller.to_string()))
            .map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.last_invocation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_invocation.is_empty()
    }
}
