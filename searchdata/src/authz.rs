//! Authorization capability
//!
//! The policy engine lives outside this crate. The store only asks it whether
//! a subject may invoke a named function, and only when authorization is
//! enabled in the configuration.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

impl From<bool> for Decision {
    fn from(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }
}

#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Decide whether `subject` may call `function`.
    async fn authorize(&self, subject: &str, function: &str) -> Decision;
}

/// Allows every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermitAll;

#[async_trait]
impl Authorizer for PermitAll {
    async fn authorize(&self, _subject: &str, _function: &str) -> Decision {
        Decision::Allow
    }
}
