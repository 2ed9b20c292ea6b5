//! Mock implementations for testing
//!
//! These mocks enable dispatcher tests without a database or network.

use super::traits::*;
use super::{Dispatcher, InboundMessage};
use crate::menu::Reply;
use crate::notify::{NotifyError, OutboundMessage};
use crate::timer::{TimerEvent, TimerRegistry};
use crate::user::{ChatId, User, UserStore};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// In-memory repository
// ============================================================================

/// Repository backed by a map, with switchable write failures
#[derive(Default)]
pub struct InMemoryRepository {
    users: Mutex<BTreeMap<ChatId, User>>,
    fail_saves: AtomicBool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn saved(&self, chat_id: ChatId) -> Option<User> {
        self.users.lock().unwrap().get(&chat_id).cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn load_all(&self) -> Result<HashMap<ChatId, User>, RepoError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .map(|(id, user)| (*id, user.clone()))
            .collect())
    }

    async fn save_user(&self, chat_id: ChatId, user: &User) -> Result<(), RepoError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepoError::Unavailable("injected failure".to_string()));
        }
        self.users.lock().unwrap().insert(chat_id, user.clone());
        Ok(())
    }
}

// ============================================================================
// Recording notifier
// ============================================================================

/// Records every message; sends to stalled chats never complete
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<OutboundMessage>>,
    stalled: Mutex<HashSet<ChatId>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stall(&self, chat_id: ChatId) {
        self.stalled.lock().unwrap().insert(chat_id);
    }

    pub fn messages_for(&self, chat_id: ChatId) -> Vec<Reply> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.reply.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        let stalled = self.stalled.lock().unwrap().contains(&message.chat_id);
        if stalled {
            std::future::pending::<()>().await;
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ============================================================================
// Test dispatcher
// ============================================================================

pub struct TestDispatcher {
    pub dispatcher: Dispatcher,
    pub repo: Arc<InMemoryRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub events: mpsc::UnboundedReceiver<TimerEvent>,
}

impl TestDispatcher {
    pub fn new() -> TestDispatcherBuilder {
        TestDispatcherBuilder {
            tick: Duration::from_secs(60),
            users: Vec::new(),
        }
    }

    pub async fn send(&self, chat_id: i64, text: &str) -> Reply {
        self.dispatcher
            .handle(InboundMessage {
                chat_id: ChatId(chat_id),
                first_name: "Ada".to_string(),
                text: text.to_string(),
            })
            .await
    }

    pub async fn user(&self, chat_id: i64) -> User {
        self.dispatcher
            .users()
            .get(ChatId(chat_id))
            .await
            .expect("user should exist")
    }

    /// Wait for the next timer event
    pub async fn next_event(&mut self, within: Duration) -> Option<TimerEvent> {
        tokio::time::timeout(within, self.events.recv())
            .await
            .ok()
            .flatten()
    }
}

pub struct TestDispatcherBuilder {
    tick: Duration,
    users: Vec<(ChatId, User)>,
}

impl TestDispatcherBuilder {
    pub fn tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Seed the store with an already known user
    pub fn user(mut self, chat_id: i64, user: User) -> Self {
        self.users.push((ChatId(chat_id), user));
        self
    }

    pub async fn build(self) -> TestDispatcher {
        let repo = Arc::new(InMemoryRepository::new());
        for (chat_id, user) in &self.users {
            repo.save_user(*chat_id, user).await.unwrap();
        }
        let users = Arc::new(UserStore::hydrate(&repo).await.unwrap());
        let notifier = Arc::new(RecordingNotifier::new());
        let (timers, events) = TimerRegistry::new(self.tick);
        let dispatcher = Dispatcher::new(users, timers, repo.clone(), notifier.clone());
        TestDispatcher {
            dispatcher,
            repo,
            notifier,
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::{labels, process, Menu, Step, UserAction};
    use crate::timer::{ActiveSession, SessionKind, TimerEvent};
    use crate::user::Task;
    use tokio_util::sync::CancellationToken;

    const NOTHING_ACTIVE: &str = "Oops, looks like you don't have an active time guard!";

    fn ready_user() -> User {
        let mut user = User::new("Ada");
        user.last_action = UserAction::main_menu();
        user
    }

    #[tokio::test]
    async fn test_start_creates_user_in_onboarding() {
        let rt = TestDispatcher::new().build().await;
        let reply = rt.send(1, labels::START_COMMAND).await;

        let keyboard = reply.keyboard().unwrap();
        assert_eq!(keyboard.rows, labels::FOCUS_OPTIONS);
        let user = rt.user(1).await;
        assert_eq!(user.last_action.menu, Menu::InitFocus);
        assert_eq!(user.focus_duration_mins, 15);
        assert_eq!(user.break_duration_mins, 5);
        assert_eq!(rt.repo.saved(ChatId(1)), Some(user));
        assert_eq!(rt.notifier.messages_for(ChatId(1)), vec![reply]);
    }

    #[tokio::test]
    async fn test_unknown_chat_gets_hint() {
        let rt = TestDispatcher::new().build().await;
        let reply = rt.send(2, "hello").await;
        assert_eq!(
            reply.text_body(),
            Some("Oops! I don't know you yet. Please type /start to start")
        );
        assert!(rt.dispatcher.users().get(ChatId(2)).await.is_none());
    }

    #[tokio::test]
    async fn test_second_start_does_not_reset_user() {
        let rt = TestDispatcher::new().build().await;
        rt.send(1, labels::START_COMMAND).await;
        rt.send(1, "30 minutes").await;
        rt.send(1, labels::START_COMMAND).await;
        let user = rt.user(1).await;
        assert_eq!(user.focus_duration_mins, 30);
        assert_eq!(user.last_action.menu, Menu::InitBreak);
    }

    #[tokio::test]
    async fn test_focus_session_start_and_stop() {
        let rt = TestDispatcher::new().user(5, ready_user()).build().await;

        rt.send(5, labels::START_FOCUS).await;
        let active = rt.dispatcher.timers().active(ChatId(5)).await.unwrap();
        assert_eq!(active.kind, SessionKind::Focus);
        assert_eq!(active.seconds_left, 900);
        assert_eq!(rt.user(5).await.last_action.menu, Menu::InFocus);

        let reply = rt.send(5, labels::STOP_FOCUS).await;
        assert_eq!(reply.text_body(), Some("Focus stopped"));
        assert!(rt.dispatcher.timers().active(ChatId(5)).await.is_none());
        assert_eq!(rt.dispatcher.timers().len().await, 0);
        assert_eq!(rt.user(5).await.last_action, UserAction::main_menu());
    }

    #[tokio::test]
    async fn test_start_conflict_keeps_existing_timer() {
        let rt = TestDispatcher::new().user(5, ready_user()).build().await;
        rt.dispatcher
            .timers()
            .start(ChatId(5), SessionKind::Focus, 15)
            .await
            .unwrap();

        let reply = rt.send(5, labels::START_BREAK).await;
        assert!(reply
            .text_body()
            .unwrap()
            .contains("already have an active time guard"));
        assert_eq!(rt.dispatcher.timers().len().await, 1);
        let active = rt.dispatcher.timers().active(ChatId(5)).await.unwrap();
        assert_eq!(active.kind, SessionKind::Focus);
        assert_eq!(active.seconds_left, 900);
        assert_eq!(rt.user(5).await.last_action, UserAction::main_menu());
    }

    #[tokio::test]
    async fn test_duplicate_fourth_task_is_rejected() {
        let mut user = ready_user();
        for name in ["write", "read", "review"] {
            user.workday.add_task(Task::new(name, 2)).unwrap();
        }
        user.last_action = UserAction::new(Menu::SettingsWorkday);
        let rt = TestDispatcher::new().user(3, user).build().await;

        rt.send(3, labels::ADD_TASK).await;
        assert_eq!(rt.user(3).await.last_action.step, Step::NewTaskName);
        let reply = rt.send(3, "read").await;

        assert_eq!(reply.text_body(), Some("Task with this name already exists"));
        let user = rt.user(3).await;
        assert_eq!(user.workday.len(), 3);
        assert_eq!(user.last_action.menu, Menu::SettingsWorkday);
    }

    #[tokio::test]
    async fn test_task_creation_is_persisted() {
        let mut user = ready_user();
        user.last_action = UserAction::new(Menu::SettingsWorkday);
        let rt = TestDispatcher::new().user(3, user).build().await;

        rt.send(3, labels::ADD_TASK).await;
        rt.send(3, "write docs").await;
        rt.send(3, "4").await;

        let saved = rt.repo.saved(ChatId(3)).unwrap();
        assert_eq!(saved.workday.tasks_for_day, vec![Task::new("write docs", 4)]);
        assert_eq!(saved.last_action, UserAction::new(Menu::SettingsWorkday));
    }

    #[tokio::test]
    async fn test_expiry_returns_user_to_main_menu() {
        let mut rt = TestDispatcher::new()
            .tick(Duration::from_millis(1))
            .user(7, ready_user())
            .build()
            .await;
        rt.send(7, labels::START_BREAK).await;
        assert_eq!(rt.user(7).await.last_action.menu, Menu::InBreak);

        let event = rt.next_event(Duration::from_secs(10)).await.unwrap();
        rt.dispatcher.on_timer_event(event).await;

        assert_eq!(rt.user(7).await.last_action, UserAction::main_menu());
        assert_eq!(
            rt.repo.saved(ChatId(7)).unwrap().last_action,
            UserAction::main_menu()
        );
        let last = rt.notifier.messages_for(ChatId(7)).pop().unwrap();
        assert_eq!(
            last.text_body(),
            Some(SessionKind::Break.finish_message())
        );
        assert_eq!(last.keyboard(), Some(&labels::main_keyboard()));

        // Exactly one completion
        assert!(rt.next_event(Duration::from_millis(50)).await.is_none());
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_fail_request() {
        let rt = TestDispatcher::new().user(4, ready_user()).build().await;
        rt.repo.set_fail_saves(true);

        let reply = rt.send(4, labels::SETTINGS).await;
        assert_eq!(reply.text_body(), Some("Settings"));
        assert_eq!(rt.user(4).await.last_action.menu, Menu::Settings);
        assert_eq!(
            rt.repo.saved(ChatId(4)).unwrap().last_action.menu,
            Menu::MainMenu
        );
    }

    #[tokio::test]
    async fn test_timer_loop_stops_on_cancel() {
        let rt = TestDispatcher::new().build().await;
        let cancel = tokio_util::sync::CancellationToken::new();
        let task = tokio::spawn(
            rt.dispatcher
                .clone()
                .run_timer_events(rt.events, cancel.clone()),
        );
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    /// Start a focus session, keep the request-time view of it, then let it
    /// expire and run the completion handler.
    async fn expire_behind_request(rt: &mut TestDispatcher, chat_id: i64) -> (User, ActiveSession) {
        rt.send(chat_id, labels::START_FOCUS).await;
        let stale = rt.user(chat_id).await;
        let session = rt.dispatcher.timers().active(ChatId(chat_id)).await.unwrap();
        assert_eq!(stale.last_action.menu, Menu::InFocus);

        let event = rt.next_event(Duration::from_secs(10)).await.unwrap();
        rt.dispatcher.on_timer_event(event).await;
        assert_eq!(rt.user(chat_id).await.last_action, UserAction::main_menu());
        (stale, session)
    }

    #[tokio::test]
    async fn test_stop_losing_to_expiry_keeps_main_menu() {
        let mut rt = TestDispatcher::new()
            .tick(Duration::from_millis(1))
            .user(5, ready_user())
            .build()
            .await;
        let (stale, session) = expire_behind_request(&mut rt, 5).await;

        let result = process(labels::STOP_FOCUS, &stale, Some(session));
        let reply = rt.dispatcher.apply(ChatId(5), &stale, result).await;

        assert_eq!(reply.text_body(), Some(NOTHING_ACTIVE));
        assert_eq!(rt.user(5).await.last_action, UserAction::main_menu());
        assert_eq!(
            rt.repo.saved(ChatId(5)).unwrap().last_action,
            UserAction::main_menu()
        );
        // Nothing is stuck: the main menu works right away
        rt.send(5, labels::SETTINGS).await;
        assert_eq!(rt.user(5).await.last_action.menu, Menu::Settings);
    }

    #[tokio::test]
    async fn test_time_left_at_expiry_keeps_main_menu() {
        let mut rt = TestDispatcher::new()
            .tick(Duration::from_millis(1))
            .user(5, ready_user())
            .build()
            .await;
        let (stale, session) = expire_behind_request(&mut rt, 5).await;

        let result = process(labels::TIME_LEFT, &stale, Some(session));
        rt.dispatcher.apply(ChatId(5), &stale, result).await;

        assert_eq!(rt.user(5).await.last_action, UserAction::main_menu());
    }

    #[tokio::test]
    async fn test_stop_losing_to_expiry_flag_is_silent() {
        let mut rt = TestDispatcher::new().user(5, ready_user()).build().await;
        let keeper = rt
            .dispatcher
            .timers()
            .start(ChatId(5), SessionKind::Focus, 15)
            .await
            .unwrap();
        rt.dispatcher
            .users()
            .modify(ChatId(5), |u| u.last_action = UserAction::new(Menu::InFocus))
            .await;
        let user = rt.user(5).await;
        let session = rt.dispatcher.timers().active(ChatId(5)).await.unwrap();

        // The countdown owns the session end but has not been removed yet
        assert!(keeper.stop());
        let result = process(labels::STOP_FOCUS, &user, Some(session));
        let reply = rt.dispatcher.apply(ChatId(5), &user, result).await;

        assert_eq!(reply, Reply::None);
        assert_eq!(rt.user(5).await.last_action.menu, Menu::InFocus);
        assert_eq!(rt.dispatcher.timers().len().await, 1);
        assert!(rt.notifier.messages_for(ChatId(5)).is_empty());
        // The cancelled countdown never reports a completion
        assert!(rt.next_event(Duration::from_millis(50)).await.is_none());
    }

    #[tokio::test]
    async fn test_stalled_delivery_does_not_block_other_chats() {
        let mut later = ready_user();
        later.set_break_duration(10).unwrap();
        let rt = TestDispatcher::new()
            .tick(Duration::from_millis(1))
            .user(7, ready_user())
            .user(8, later)
            .build()
            .await;
        rt.send(7, labels::START_BREAK).await;
        rt.send(8, labels::START_BREAK).await;
        rt.notifier.stall(ChatId(7));

        let TestDispatcher {
            dispatcher,
            notifier,
            events,
            ..
        } = rt;
        let cancel = CancellationToken::new();
        let event_loop = tokio::spawn(dispatcher.clone().run_timer_events(events, cancel.clone()));

        let finish = Some(SessionKind::Break.finish_message());
        let delivered = tokio::time::timeout(Duration::from_secs(10), async {
            while !notifier
                .messages_for(ChatId(8))
                .iter()
                .any(|r| r.text_body() == finish)
            {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(delivered.is_ok(), "second chat was held up");

        assert_eq!(
            dispatcher.users().get(ChatId(8)).await.unwrap().last_action,
            UserAction::main_menu()
        );
        assert_eq!(
            dispatcher.users().get(ChatId(7)).await.unwrap().last_action,
            UserAction::main_menu()
        );
        assert!(!notifier
            .messages_for(ChatId(7))
            .iter()
            .any(|r| r.text_body() == finish));

        cancel.cancel();
        event_loop.await.unwrap();
    }
}
