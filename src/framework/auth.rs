// auth.rs - Authorization Policy
// Public commands are open to everyone; admin commands only to the configured
// admin set. Pure: no I/O, no state beyond the immutable admin set.

use std::collections::HashSet;

use crate::framework::registry::{Command, Privilege};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotAuthorized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied(DenyReason),
}

#[derive(Debug, Clone, Default)]
pub struct AuthorizationPolicy {
    admins: HashSet<String>,
}

impl AuthorizationPolicy {
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            admins: admins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_admin(&self, caller: &str) -> bool {
        self.admins.contains(caller)
    }

    pub fn authorize(&self, command: &Command, caller: &str) -> Authorization {
        self.check(command.required_privilege(), caller)
    }

    pub fn check(&self, privilege: Privilege, caller: &str) -> Authorization {
        match privilege {
            Privilege::Public => Authorization::Allowed,
            Privilege::Admin if self.is_admin(caller) => Authorization::Allowed,
            Privilege::Admin => Authorization::Denied(DenyReason::NotAuthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_always_allowed() {
        let policy = AuthorizationPolicy::new(["a1"]);
        for caller in ["a1", "u1", "", "someone-else"] {
            assert_eq!(policy.check(Privilege::Public, caller), Authorization::Allowed);
        }
        let empty = AuthorizationPolicy::default();
        assert_eq!(empty.check(Privilege::Public, "u1"), Authorization::Allowed);
    }

    #[test]
    fn test_admin_requires_membership() {
        let policy = AuthorizationPolicy::new(["a1", "a2"]);
        assert_eq!(policy.check(Privilege::Admin, "a1"), Authorization::Allowed);
        assert_eq!(policy.check(Privilege::Admin, "a2"), Authorization::Allowed);
        assert_eq!(
            policy.check(Privilege::Admin, "u1"),
            Authorization::Denied(DenyReason::NotAuthorized)
        );
        // ids are opaque: no trimming or case folding
        assert_eq!(
            policy.check(Privilege::Admin, "A1"),
            Authorization::Denied(DenyReason::NotAuthorized)
        );
    }

    #[test]
    fn test_authorize_reads_command_privilege() {
        let policy = AuthorizationPolicy::new(["a1"]);
        let shutdown = Command::new("shutdown", |_ctx| async { Ok(()) }).privilege(Privilege::Admin);
        assert_eq!(
            policy.authorize(&shutdown, "u1"),
            Authorization::Denied(DenyReason::NotAuthorized)
        );
        assert_eq!(policy.authorize(&shutdown, "a1"), Authorization::Allowed);
    }
}
