//! Role-based permission checks for privileged commands.

use std::sync::Arc;

use anyhow::Result;

use crate::store::UserStore;

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCheck {
    /// The sender holds at least one of the required roles
    Authorized,
    /// The sender has no user record at all
    Unregistered,
    /// The sender is registered but lacks every required role
    MissingRole,
}

/// Checks whether a Telegram account may run privileged commands.
#[derive(Clone)]
pub struct RoleGate {
    users: Arc<dyn UserStore>,
}

impl RoleGate {
    /// Create a gate over the given user store.
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Check the sender against the required roles. One matching role is
    /// enough. Membership is resolved through the store's role query, not
    /// the roles carried on the user record, so stores that answer the two
    /// differently stay authoritative.
    pub async fn check(&self, telegram_id: i64, required: &[&str]) -> Result<RoleCheck> {
        let Some(user) = self.users.get_by_telegram_id(telegram_id).await? else {
            return Ok(RoleCheck::Unregistered);
        };
        for role in required {
            let holders = self.users.users_by_role(role).await?;
            if holders.iter().any(|h| h.id == user.id) {
                return Ok(RoleCheck::Authorized);
            }
        }
        Ok(RoleCheck::MissingRole)
    }
}
