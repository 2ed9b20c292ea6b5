//! Request dispatch and timer completion handling
//!
//! The [`Dispatcher`] owns the injected services: it looks the user up,
//! runs the pure menu transition, executes the resulting effects against
//! the store and the timer registry, persists and notifies. The same
//! dispatcher consumes [`TimerEvent`]s in its own loop.

pub mod traits;

#[cfg(test)]
pub mod testing;

pub use traits::*;

use crate::menu::{self, labels, Effect, Menu, Reply, TransitionResult, UserAction};
use crate::notify::OutboundMessage;
use crate::timer::{SessionKind, StopOutcome, TimerEvent, TimerRegistry};
use crate::user::{ChatId, User, UserStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One inbound unit from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: ChatId,
    pub first_name: String,
    pub text: String,
}

#[derive(Clone)]
pub struct Dispatcher {
    users: Arc<UserStore>,
    timers: TimerRegistry,
    repo: Arc<dyn UserRepository>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(
        users: Arc<UserStore>,
        timers: TimerRegistry,
        repo: Arc<dyn UserRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            users,
            timers,
            repo,
            notifier,
        }
    }

    pub fn users(&self) -> &UserStore {
        &self.users
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// Handle one inbound message and return the reply that was sent.
    pub async fn handle(&self, message: InboundMessage) -> Reply {
        let chat_id = message.chat_id;
        let reply = match self.users.get(chat_id).await {
            Some(user) => self.dispatch(chat_id, &message.text, user).await,
            None => self.first_contact(message).await,
        };
        self.notify(chat_id, &reply).await;
        reply
    }

    async fn first_contact(&self, message: InboundMessage) -> Reply {
        let chat_id = message.chat_id;
        if message.text != labels::START_COMMAND {
            tracing::debug!(%chat_id, "Message from unknown chat");
            return menu::unknown_user();
        }

        let user = User::new(message.first_name);
        if self.users.add(chat_id, user.clone()).await {
            self.persist(chat_id).await;
            return menu::onboard(&user).reply;
        }

        // Lost a race with a concurrent /start for the same chat
        match self.users.get(chat_id).await {
            Some(existing) => self.dispatch(chat_id, &message.text, existing).await,
            None => Reply::None,
        }
    }

    async fn dispatch(&self, chat_id: ChatId, text: &str, user: User) -> Reply {
        let session = self.timers.active(chat_id).await;
        let result = menu::process(text, &user, session);
        tracing::debug!(
            %chat_id,
            menu = ?user.last_action.menu,
            next = ?result.next.menu,
            effects = result.effects.len(),
            "Processed message"
        );
        self.apply(chat_id, &user, result).await
    }

    /// Execute the transition's effects, then record the next position.
    async fn apply(&self, chat_id: ChatId, user: &User, result: TransitionResult) -> Reply {
        let TransitionResult {
            mut reply,
            mut next,
            effects,
        } = result;

        for effect in effects {
            match effect {
                Effect::SaveUser(updated) => {
                    if let Err(e) = self.users.update_user(chat_id, updated).await {
                        tracing::error!(%chat_id, error = %e, "Aborting request");
                        return Reply::None;
                    }
                }
                Effect::StartSession { kind, minutes } => {
                    if let Err(e) = self.timers.start(chat_id, kind, minutes).await {
                        tracing::warn!(%chat_id, ?kind, error = %e, "Session start rejected");
                        TransitionResult { reply, next, .. } = menu::session_conflict(user);
                    }
                }
                Effect::StopSession => match self.timers.stop(chat_id).await {
                    StopOutcome::Stopped(_) => {}
                    StopOutcome::NotRunning => {
                        TransitionResult { reply, next, .. } = menu::nothing_active(user);
                    }
                    StopOutcome::AlreadyStopped => {
                        tracing::debug!(%chat_id, "Session already ending, ignoring stop");
                        return Reply::None;
                    }
                },
            }
        }

        self.users
            .save_last_action(chat_id, &user.last_action, next)
            .await;
        self.persist(chat_id).await;
        reply
    }

    /// Write the current in-memory record through to the repository.
    ///
    /// Failures are logged; the in-memory state stays authoritative.
    async fn persist(&self, chat_id: ChatId) {
        let Some(user) = self.users.get(chat_id).await else {
            return;
        };
        if let Err(e) = self.repo.save_user(chat_id, &user).await {
            tracing::error!(%chat_id, error = %e, "Failed to persist user");
        }
    }

    async fn notify(&self, chat_id: ChatId, reply: &Reply) {
        if reply.is_none() {
            return;
        }
        let message = OutboundMessage::new(chat_id, reply.clone());
        if let Err(e) = self.notifier.send(&message).await {
            tracing::warn!(%chat_id, error = %e, "Failed to deliver reply");
        }
    }

    /// Consume timer completions until the channel closes or `cancel` fires.
    ///
    /// Each completion is handled on its own task so a slow or rate-limited
    /// delivery for one chat does not hold back the others.
    pub async fn run_timer_events(
        self,
        mut events: mpsc::UnboundedReceiver<TimerEvent>,
        cancel: CancellationToken,
    ) {
        tracing::info!("Timer event loop started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        let dispatcher = self.clone();
                        tokio::spawn(async move { dispatcher.on_timer_event(event).await });
                    }
                    None => break,
                },
            }
        }
        tracing::info!("Timer event loop stopped");
    }

    pub async fn on_timer_event(&self, event: TimerEvent) {
        let TimerEvent::Expired {
            chat_id,
            kind,
            finish_message,
        } = event;
        let session_menu = match kind {
            SessionKind::Focus => Menu::InFocus,
            SessionKind::Break => Menu::InBreak,
        };

        let moved = self
            .users
            .modify(chat_id, |user| {
                let in_session = user.last_action.menu == session_menu;
                if in_session {
                    user.last_action = UserAction::main_menu();
                }
                in_session
            })
            .await;

        match moved {
            None => {
                tracing::warn!(%chat_id, ?kind, "Session finished for unknown chat");
                return;
            }
            Some(true) => self.persist(chat_id).await,
            Some(false) => {}
        }

        tracing::info!(%chat_id, ?kind, "Session finished");
        let reply = Reply::options(finish_message, labels::main_keyboard());
        self.notify(chat_id, &reply).await;
    }
}
