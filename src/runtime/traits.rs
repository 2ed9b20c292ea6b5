//! Trait abstractions for runtime I/O
//!
//! These traits let the dispatcher run against in-memory mocks in tests.

use crate::db::{Database, DbError};
use crate::notify::{NotifyError, OutboundMessage};
use crate::user::{ChatId, User};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Durable copy of the user records
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Every stored record, used once at startup
    async fn load_all(&self) -> Result<HashMap<ChatId, User>, RepoError>;

    /// Upsert one record
    async fn save_user(&self, chat_id: ChatId, user: &User) -> Result<(), RepoError>;
}

/// Sink for outbound messages
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: UserRepository + ?Sized> UserRepository for Arc<T> {
    async fn load_all(&self) -> Result<HashMap<ChatId, User>, RepoError> {
        (**self).load_all().await
    }

    async fn save_user(&self, chat_id: ChatId, user: &User) -> Result<(), RepoError> {
        (**self).save_user(chat_id, user).await
    }
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        (**self).send(message).await
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as a `UserRepository`
#[derive(Clone)]
pub struct DatabaseRepository {
    db: Database,
}

impl DatabaseRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for DatabaseRepository {
    async fn load_all(&self) -> Result<HashMap<ChatId, User>, RepoError> {
        Ok(self.db.load_users()?.into_iter().collect())
    }

    async fn save_user(&self, chat_id: ChatId, user: &User) -> Result<(), RepoError> {
        self.db.save_user(chat_id, user)?;
        Ok(())
    }
}
