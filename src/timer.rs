//! Countdown timers for focus and break sessions
//!
//! At most one [`TimeKeeper`] exists per chat. Each runs as its own tokio
//! task; when one expires on its own the registry drops it and emits a
//! [`TimerEvent`] for the dispatcher loop to turn into a notification.

mod keeper;

pub use keeper::TimeKeeper;

use crate::user::ChatId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Focus,
    Break,
}

impl SessionKind {
    pub fn finish_message(self) -> &'static str {
        match self {
            SessionKind::Focus => "Focus session is over, well done! Time to take a break",
            SessionKind::Break => "Break is over! Ready for the next focus session?",
        }
    }
}

/// Snapshot of a running session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveSession {
    pub kind: SessionKind,
    pub seconds_left: u32,
}

/// Produced when a session runs out on its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Expired {
        chat_id: ChatId,
        kind: SessionKind,
        finish_message: String,
    },
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    #[error("chat [{0}] already has an active time keeper")]
    AlreadyRunning(ChatId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// No session was registered for the chat
    NotRunning,
    /// This call ended the session
    Stopped(SessionKind),
    /// The session was already ending (lost a race with expiry)
    AlreadyStopped,
}

#[derive(Clone)]
pub struct TimerRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    keepers: RwLock<HashMap<ChatId, Arc<TimeKeeper>>>,
    tick: Duration,
    events: mpsc::UnboundedSender<TimerEvent>,
}

impl TimerRegistry {
    pub fn new(tick: Duration) -> (Self, mpsc::UnboundedReceiver<TimerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let registry = Self {
            inner: Arc::new(RegistryInner {
                keepers: RwLock::new(HashMap::new()),
                tick,
                events,
            }),
        };
        (registry, rx)
    }

    /// Start a session of `minutes` for the chat.
    ///
    /// Fails without touching the running keeper if the chat already has one.
    pub async fn start(
        &self,
        chat_id: ChatId,
        kind: SessionKind,
        minutes: u32,
    ) -> Result<Arc<TimeKeeper>, TimerError> {
        let keeper = {
            let mut keepers = self.inner.keepers.write().await;
            if keepers.get(&chat_id).is_some_and(|k| !k.is_stopped()) {
                return Err(TimerError::AlreadyRunning(chat_id));
            }
            let keeper = Arc::new(TimeKeeper::new(chat_id, kind, minutes));
            keepers.insert(chat_id, keeper.clone());
            keeper
        };

        tracing::info!(%chat_id, ?kind, minutes, "Time keeper started");

        let registry = self.clone();
        let task_keeper = keeper.clone();
        tokio::spawn(async move {
            if task_keeper.clone().run(registry.inner.tick).await {
                registry.remove(&task_keeper).await;
                tracing::info!(%chat_id, ?kind, "Time keeper expired");
                let event = TimerEvent::Expired {
                    chat_id,
                    kind,
                    finish_message: kind.finish_message().to_string(),
                };
                if registry.inner.events.send(event).is_err() {
                    tracing::warn!(%chat_id, "Timer event receiver dropped");
                }
            }
        });

        Ok(keeper)
    }

    /// Stop the chat's session on behalf of the user.
    pub async fn stop(&self, chat_id: ChatId) -> StopOutcome {
        let mut keepers = self.inner.keepers.write().await;
        let Some(keeper) = keepers.get(&chat_id) else {
            return StopOutcome::NotRunning;
        };
        if keeper.stop() {
            let kind = keeper.kind();
            keepers.remove(&chat_id);
            tracing::info!(%chat_id, ?kind, "Time keeper stopped by user");
            StopOutcome::Stopped(kind)
        } else {
            StopOutcome::AlreadyStopped
        }
    }

    pub async fn active(&self, chat_id: ChatId) -> Option<ActiveSession> {
        let keepers = self.inner.keepers.read().await;
        keepers
            .get(&chat_id)
            .filter(|k| !k.is_stopped())
            .map(|k| ActiveSession {
                kind: k.kind(),
                seconds_left: k.seconds_left(),
            })
    }

    #[allow(dead_code)] // Used in tests
    pub async fn len(&self) -> usize {
        self.inner.keepers.read().await.len()
    }

    /// Drop `keeper` from the registry unless it was already replaced.
    async fn remove(&self, keeper: &Arc<TimeKeeper>) {
        let mut keepers = self.inner.keepers.write().await;
        if keepers
            .get(&keeper.chat_id())
            .is_some_and(|current| Arc::ptr_eq(current, keeper))
        {
            keepers.remove(&keeper.chat_id());
        }
    }
}

/// Human readable remaining time.
///
/// Whole minutes print as minutes only, anything under a minute as seconds
/// only, the rest as minutes and seconds.
pub fn format_remaining(seconds: u32) -> String {
    fn unit(n: u32, name: &str) -> String {
        if n == 1 {
            format!("1 {name}")
        } else {
            format!("{n} {name}s")
        }
    }

    let (minutes, rest) = (seconds / 60, seconds % 60);
    match (minutes, rest) {
        (0, s) => unit(s, "second"),
        (m, 0) => unit(m, "minute"),
        (m, s) => format!("{} {}", unit(m, "minute"), unit(s, "second")),
    }
}
