//! Privileged commands for managing phrases, users and roles.
//!
//! Every reply goes to the sender's private chat. Argument lists are
//! `;`-separated, matching how the commands are documented to admins.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use super::UpdateHandler;
use crate::access::{RoleCheck, RoleGate};
use crate::event::InboundEvent;
use crate::outbound::MessageDispatcher;
use crate::store::{NewUser, Phrase, PhraseCategory, PhraseStore, UserStore};

/// Handles /addphrase, /removephrase, /createuser, /addrole, /removerole.
pub struct AdminHandler {
    dispatcher: Arc<MessageDispatcher>,
    gate: RoleGate,
    users: Arc<dyn UserStore>,
    phrases: Arc<dyn PhraseStore>,
}

impl AdminHandler {
    /// Create the handler.
    #[must_use]
    pub fn new(
        dispatcher: Arc<MessageDispatcher>,
        gate: RoleGate,
        users: Arc<dyn UserStore>,
        phrases: Arc<dyn PhraseStore>,
    ) -> Self {
        Self {
            dispatcher,
            gate,
            users,
            phrases,
        }
    }

    /// Run the permission check and send the denial reply if it fails.
    /// Returns `true` when the sender may proceed.
    async fn authorize(&self, sender_id: i64, required: &[&str]) -> Result<bool> {
        match self.gate.check(sender_id, required).await? {
            RoleCheck::Authorized => Ok(true),
            RoleCheck::Unregistered => {
                self.dispatcher.enqueue(sender_id, "Ты не зарегистрирован!").await;
                Ok(false)
            }
            RoleCheck::MissingRole => {
                let reply = if required.contains(&"Admin") {
                    "У тебя нет прав администратора!"
                } else {
                    "У тебя нет прав модератора!"
                };
                self.dispatcher.enqueue(sender_id, reply).await;
                Ok(false)
            }
        }
    }

    async fn add_phrase(&self, sender_id: i64, args: &str) -> Result<()> {
        if !self.authorize(sender_id, &["Admin", "Moderator"]).await? {
            return Ok(());
        }

        let Some((trigger, response)) = args.split_once(';') else {
            self.dispatcher
                .enqueue(sender_id, "Используй формат: /addphrase триггер;ответ")
                .await;
            return Ok(());
        };
        let trigger = trigger.trim().to_string();

        self.phrases
            .add_phrase(Phrase {
                category: PhraseCategory::Keyword,
                trigger: trigger.clone(),
                response: response.trim().to_string(),
            })
            .await?;
        self.dispatcher
            .enqueue(sender_id, format!("Фраза '{trigger}' добавлена!"))
            .await;
        Ok(())
    }

    async fn remove_phrase(&self, sender_id: i64, args: &str) -> Result<()> {
        if !self.authorize(sender_id, &["Admin", "Moderator"]).await? {
            return Ok(());
        }

        let trigger = args.trim();
        let removed = self
            .phrases
            .remove_phrase(trigger, PhraseCategory::Keyword)
            .await?;
        let reply = if removed {
            format!("Фраза '{trigger}' удалена!")
        } else {
            format!("Фраза '{trigger}' не найдена.")
        };
        self.dispatcher.enqueue(sender_id, reply).await;
        Ok(())
    }

    async fn create_user(&self, sender_id: i64, args: &str) -> Result<()> {
        if !self.authorize(sender_id, &["Admin"]).await? {
            return Ok(());
        }

        let parts: Vec<&str> = args.splitn(3, ';').collect();
        let age = parts.get(2).and_then(|a| a.trim().parse::<u32>().ok());
        let (Some(name), Some(email), Some(age)) = (parts.first(), parts.get(1), age) else {
            self.dispatcher
                .enqueue(sender_id, "Используй формат: /createuser Имя;Email;Возраст")
                .await;
            return Ok(());
        };

        let created = self
            .users
            .add_user(NewUser {
                telegram_id: sender_id,
                name: name.trim().to_string(),
                email: email.trim().to_string(),
                age,
            })
            .await?;
        self.dispatcher
            .enqueue(
                sender_id,
                format!("Пользователь {} создан с ID {}", created.name, created.id),
            )
            .await;
        Ok(())
    }

    /// Parse `UserId;RoleName` args; on failure sends the usage hint and
    /// returns `None`.
    async fn parse_role_args(
        &self,
        sender_id: i64,
        args: &str,
        usage: &str,
    ) -> Result<Option<(Uuid, String)>> {
        let parsed = args
            .split_once(';')
            .and_then(|(id, role)| Uuid::parse_str(id.trim()).ok().map(|id| (id, role)));
        let Some((user_id, role)) = parsed else {
            self.dispatcher.enqueue(sender_id, usage).await;
            return Ok(None);
        };

        let role = role.trim().to_string();
        if !self.users.role_exists(&role).await? {
            self.dispatcher
                .enqueue(sender_id, format!("Роль '{role}' не найдена."))
                .await;
            return Ok(None);
        }
        if self.users.get_by_id(user_id).await?.is_none() {
            self.dispatcher
                .enqueue(sender_id, format!("Пользователь {user_id} не найден."))
                .await;
            return Ok(None);
        }
        Ok(Some((user_id, role)))
    }

    async fn add_role(&self, sender_id: i64, args: &str) -> Result<()> {
        if !self.authorize(sender_id, &["Admin"]).await? {
            return Ok(());
        }
        let Some((user_id, role)) = self
            .parse_role_args(sender_id, args, "Используй формат: /addrole UserId;RoleName")
            .await?
        else {
            return Ok(());
        };

        self.users.assign_role(user_id, &role).await?;
        self.dispatcher
            .enqueue(
                sender_id,
                format!("Пользователю {user_id} присвоена роль {role}."),
            )
            .await;
        Ok(())
    }

    async fn remove_role(&self, sender_id: i64, args: &str) -> Result<()> {
        if !self.authorize(sender_id, &["Admin"]).await? {
            return Ok(());
        }
        let Some((user_id, role)) = self
            .parse_role_args(
                sender_id,
                args,
                "Используй формат: /removerole UserId;RoleName",
            )
            .await?
        else {
            return Ok(());
        };

        self.users.clear_roles(user_id).await?;
        self.dispatcher
            .enqueue(
                sender_id,
                format!("Роль {role} удалена у пользователя {user_id}."),
            )
            .await;
        Ok(())
    }
}

#[async_trait]
impl UpdateHandler for AdminHandler {
    async fn handle(&self, event: &InboundEvent, text: &str) -> Result<bool> {
        let Some(sender_id) = event.sender_id() else {
            return Ok(false);
        };

        if let Some(args) = text.strip_prefix("/addphrase ") {
            self.add_phrase(sender_id, args).await?;
        } else if let Some(args) = text.strip_prefix("/removephrase ") {
            self.remove_phrase(sender_id, args).await?;
        } else if let Some(args) = text.strip_prefix("/createuser ") {
            self.create_user(sender_id, args).await?;
        } else if let Some(args) = text.strip_prefix("/addrole ") {
            self.add_role(sender_id, args).await?;
        } else if let Some(args) = text.strip_prefix("/removerole ") {
            self.remove_role(sender_id, args).await?;
        } else {
            return Ok(false);
        }
        Ok(true)
    }
}
