//! Registered users and their roles.

use std::collections::HashMap;
use std::collections::HashSet;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Roles the bot knows about. Role assignment rejects anything else.
pub const KNOWN_ROLES: &[&str] = &["Admin", "Moderator", "User"];

/// A registered bot user.
#[derive(Debug, Clone)]
pub struct User {
    /// Stable internal identifier, used to target role commands
    pub id: Uuid,
    /// Telegram account id
    pub telegram_id: i64,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Age in years
    pub age: u32,
    /// Assigned role names
    pub roles: Vec<String>,
}

/// Fields needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Telegram account id of the new user
    pub telegram_id: i64,
    /// Display name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Age in years
    pub age: u32,
}

/// User persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by their Telegram account id.
    async fn get_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>>;

    /// Look up a user by internal id.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Register a new user with no roles. Fails on a duplicate Telegram id.
    async fn add_user(&self, new_user: NewUser) -> Result<User>;

    /// All users holding the given role.
    async fn users_by_role(&self, role: &str) -> Result<Vec<User>>;

    /// Whether the role name is known.
    async fn role_exists(&self, role: &str) -> Result<bool>;

    /// Grant a role to the user. Fails if the user does not exist.
    async fn assign_role(&self, user_id: Uuid, role: &str) -> Result<()>;

    /// Remove every role from the user. Fails if the user does not exist.
    async fn clear_roles(&self, user_id: Uuid) -> Result<()>;
}

/// `RwLock`-backed user store.
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
    roles: HashSet<String>,
}

impl InMemoryUserStore {
    /// Create an empty store seeded with [`KNOWN_ROLES`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            roles: KNOWN_ROLES.iter().map(|r| (*r).to_string()).collect(),
        }
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.telegram_id == telegram_id).cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn add_user(&self, new_user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.telegram_id == new_user.telegram_id) {
            bail!("User with Telegram id {} already exists", new_user.telegram_id);
        }
        let user = User {
            id: Uuid::new_v4(),
            telegram_id: new_user.telegram_id,
            name: new_user.name,
            email: new_user.email,
            age: new_user.age,
            roles: Vec::new(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn users_by_role(&self, role: &str) -> Result<Vec<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .filter(|u| u.roles.iter().any(|r| r == role))
            .cloned()
            .collect())
    }

    async fn role_exists(&self, role: &str) -> Result<bool> {
        Ok(self.roles.contains(role))
    }

    async fn assign_role(&self, user_id: Uuid, role: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&user_id) else {
            bail!("User {user_id} not found");
        };
        if !user.roles.iter().any(|r| r == role) {
            user.roles.push(role.to_string());
        }
        Ok(())
    }

    async fn clear_roles(&self, user_id: Uuid) -> Result<()> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&user_id) else {
            bail!("User {user_id} not found");
        };
        user.roles.clear();
        Ok(())
    }
}
