//! In-memory user records
//!
//! Every mutation takes the single store-wide lock, so mutations for
//! different chats are serialized too. This keeps the field-level view of
//! all records consistent at the price of contention once there are many
//! active chats.

use super::{ChatId, User};
use crate::menu::{Menu, UserAction};
use crate::runtime::{RepoError, UserRepository};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("user with chat id [{0}] not found")]
    UserNotFound(ChatId),
}

#[derive(Debug, Default)]
pub struct UserStore {
    users: Mutex<HashMap<ChatId, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every persisted record.
    ///
    /// Timers do not survive a restart, so users that were left inside a
    /// focus or break session are moved back to the main menu.
    pub async fn hydrate(repo: &dyn UserRepository) -> Result<Self, RepoError> {
        let mut users = repo.load_all().await?;
        let mut repaired = 0usize;
        for user in users.values_mut() {
            if matches!(user.last_action.menu, Menu::InFocus | Menu::InBreak) {
                user.last_action = UserAction::main_menu();
                repaired += 1;
            }
        }
        tracing::info!(users = users.len(), repaired, "User store hydrated");
        Ok(Self {
            users: Mutex::new(users.into_iter().collect()),
        })
    }

    /// Insert `user` unless the chat is already known. Returns whether it was added.
    pub async fn add(&self, chat_id: ChatId, user: User) -> bool {
        let mut users = self.users.lock().await;
        if users.contains_key(&chat_id) {
            tracing::debug!(%chat_id, "User already exists");
            return false;
        }
        users.insert(chat_id, user);
        tracing::info!(%chat_id, "User added");
        true
    }

    pub async fn get(&self, chat_id: ChatId) -> Option<User> {
        self.users.lock().await.get(&chat_id).cloned()
    }

    /// Snapshot of every in-memory record.
    ///
    /// Startup loading reads the durable side through
    /// `UserRepository::load_all` in [`UserStore::hydrate`]; this is the
    /// in-memory counterpart, used by tests to inspect the hydrated store.
    #[allow(dead_code)] // No production caller
    pub async fn get_all(&self) -> HashMap<ChatId, User> {
        self.users.lock().await.clone()
    }

    #[allow(dead_code)] // Used in tests
    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    /// Replace the record's data. The stored position is kept; it only moves
    /// through [`UserStore::save_last_action`] and [`UserStore::modify`].
    pub async fn update_user(&self, chat_id: ChatId, mut user: User) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        match users.get_mut(&chat_id) {
            Some(slot) => {
                user.last_action = std::mem::take(&mut slot.last_action);
                *slot = user;
                Ok(())
            }
            None => Err(StoreError::UserNotFound(chat_id)),
        }
    }

    /// Run `f` against the stored record under the store lock.
    pub async fn modify<R>(&self, chat_id: ChatId, f: impl FnOnce(&mut User) -> R) -> Option<R> {
        let mut users = self.users.lock().await;
        users.get_mut(&chat_id).map(f)
    }

    /// Replace only the conversation position of the user, provided it is
    /// still `expected`. Returns whether the position was written.
    pub async fn save_last_action(
        &self,
        chat_id: ChatId,
        expected: &UserAction,
        action: UserAction,
    ) -> bool {
        let mut users = self.users.lock().await;
        let Some(user) = users.get_mut(&chat_id) else {
            tracing::warn!(%chat_id, "Cannot save last action, user not found");
            return false;
        };
        if user.last_action != *expected {
            tracing::debug!(
                %chat_id,
                expected = ?expected.menu,
                current = ?user.last_action.menu,
                "Position moved underneath the request, keeping it"
            );
            return false;
        }
        user.last_action = action;
        true
    }
}
