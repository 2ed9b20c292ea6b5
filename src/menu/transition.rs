//! Pure menu transition function
//!
//! Given the inbound text, a copy of the user record and a snapshot of the
//! chat's session, decide the reply, the next conversation position and the
//! effects the dispatcher has to run. Nothing here touches the store or the
//! timer registry.

use super::labels::{self as l, focus_options, main_keyboard};
use super::reply::escape_html;
use super::{Effect, Keyboard, Menu, Reply, Step, UserAction};
use crate::timer::{format_remaining, ActiveSession, SessionKind};
use crate::user::workday::{MAX_FOCUS_PERIODS, MIN_FOCUS_PERIODS};
use crate::user::{Task, User, WorkdayError};

/// Longest accepted task name, in characters
pub const MAX_TASK_NAME_CHARS: usize = 64;

const UNRECOGNIZED: &str = "Sorry, I didn't get that. Please select one of the options below";
const INTERNAL_ERROR: &str = "I'm sorry, something went wrong, please try again";
const INVALID_INPUT: &str = "Invalid input, please try again";
const WRONG_VALUE: &str = "Oops, looks like you have entered wrong value. Please try again";
const TASK_EXISTS: &str = "Task with this name already exists";
const TASKS_FULL: &str = "You can't add more tasks, please delete one before adding new";

/// Result of a menu transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub reply: Reply,
    pub next: UserAction,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(reply: Reply, next: UserAction) -> Self {
        Self {
            reply,
            next,
            effects: vec![],
        }
    }

    /// Reply without moving
    fn stay(reply: Reply, user: &User) -> Self {
        Self::new(reply, user.last_action.clone())
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// First reply for a chat that was just created by `/start`
pub fn onboard(user: &User) -> TransitionResult {
    TransitionResult::new(
        Reply::options(
            format!(
                "Hello {}! I will help you to keep organised with your time!\n\
                 Please select how long you want your focus duration to be?",
                user.first_name
            ),
            focus_options(),
        ),
        UserAction::onboarding(),
    )
}

pub fn unknown_user() -> Reply {
    Reply::text(format!(
        "Oops! I don't know you yet. Please type {} to start",
        l::START_COMMAND
    ))
}

/// Reply when a session start loses to an already running one
pub fn session_conflict(user: &User) -> TransitionResult {
    TransitionResult::stay(
        Reply::options(
            "Oops, looks like you already have an active time guard!",
            keyboard_for(user.last_action.menu, user),
        ),
        user,
    )
}

/// Reply when a stop or time query finds nothing running
pub fn nothing_active(user: &User) -> TransitionResult {
    TransitionResult::stay(
        Reply::options(
            "Oops, looks like you don't have an active time guard!",
            keyboard_for(user.last_action.menu, user),
        ),
        user,
    )
}

/// Interpret `text` for a known user.
pub fn process(text: &str, user: &User, session: Option<ActiveSession>) -> TransitionResult {
    match text {
        l::START_COMMAND | l::MAIN_COMMAND => {
            return home(user, session, "Main menu".to_string());
        }
        l::DURATIONS_COMMAND => {
            let summary = format!(
                "Your focus duration is {} and your break duration is {} minutes",
                user.focus_duration_mins, user.break_duration_mins
            );
            return home(user, session, summary);
        }
        _ => {}
    }

    match user.last_action.menu {
        Menu::InitFocus => init_focus(text, user),
        Menu::InitBreak => init_break(text, user),
        Menu::MainMenu => main_menu(text, user, session),
        Menu::InFocus => in_session(text, user, session, SessionKind::Focus),
        Menu::InBreak => in_session(text, user, session, SessionKind::Break),
        Menu::Settings => settings(text, user),
        Menu::SettingsFocusDuration => focus_duration(text, user),
        Menu::SettingsBreakDuration => break_duration(text, user),
        Menu::SettingsWorkday => workday(text, user),
        Menu::SettingsWorkdayTaskEdit => task_edit(text, user),
    }
}

/// Where the commands lead: onboarding is resumed, a running session is
/// shown, everyone else lands in the main menu.
fn home(user: &User, session: Option<ActiveSession>, text: String) -> TransitionResult {
    match user.last_action.menu {
        Menu::InitFocus => TransitionResult::stay(
            Reply::options(
                "Please select how long you want your focus duration to be?",
                focus_options(),
            ),
            user,
        ),
        Menu::InitBreak => TransitionResult::stay(
            Reply::options("Please select your break duration", l::break_options()),
            user,
        ),
        _ => match session {
            Some(active) => {
                let menu = session_menu(active.kind);
                TransitionResult::new(
                    Reply::options(text, keyboard_for(menu, user)),
                    UserAction::new(menu),
                )
            }
            None => to_main_menu(text),
        },
    }
}

fn to_main_menu(text: impl Into<String>) -> TransitionResult {
    TransitionResult::new(Reply::options(text, main_keyboard()), UserAction::main_menu())
}

fn session_menu(kind: SessionKind) -> Menu {
    match kind {
        SessionKind::Focus => Menu::InFocus,
        SessionKind::Break => Menu::InBreak,
    }
}

/// The keyboard a menu normally shows
fn keyboard_for(menu: Menu, user: &User) -> Keyboard {
    match menu {
        Menu::MainMenu => main_keyboard(),
        Menu::InitFocus => focus_options(),
        Menu::InitBreak => l::break_options(),
        Menu::InFocus => l::in_focus_keyboard(),
        Menu::InBreak => l::in_break_keyboard(),
        Menu::Settings => l::settings_keyboard(),
        Menu::SettingsFocusDuration => l::focus_duration_keyboard(),
        Menu::SettingsBreakDuration => l::break_duration_keyboard(),
        Menu::SettingsWorkday => l::workday_keyboard(user.workday.task_names()),
        Menu::SettingsWorkdayTaskEdit => l::task_edit_keyboard(),
    }
}

fn unrecognized(user: &User) -> TransitionResult {
    TransitionResult::stay(
        Reply::options(UNRECOGNIZED, keyboard_for(user.last_action.menu, user)),
        user,
    )
}

// ============================================================================
// Onboarding
// ============================================================================

fn init_focus(text: &str, user: &User) -> TransitionResult {
    let Some(minutes) = l::focus_minutes(text) else {
        return unrecognized(user);
    };
    let mut updated = user.clone();
    if updated.set_focus_duration(minutes).is_err() {
        return unrecognized(user);
    }
    TransitionResult::new(
        Reply::options("Great! Now select your break duration", l::break_options()),
        UserAction::new(Menu::InitBreak),
    )
    .with_effect(Effect::SaveUser(updated))
}

fn init_break(text: &str, user: &User) -> TransitionResult {
    let Some(minutes) = l::break_minutes(text) else {
        return unrecognized(user);
    };
    let mut updated = user.clone();
    if updated.set_break_duration(minutes).is_err() {
        return unrecognized(user);
    }
    to_main_menu("Great! Now you all set to start your first focus session")
        .with_effect(Effect::SaveUser(updated))
}

// ============================================================================
// Sessions
// ============================================================================

fn main_menu(text: &str, user: &User, session: Option<ActiveSession>) -> TransitionResult {
    match text {
        l::START_FOCUS | l::START_BREAK if session.is_some() => session_conflict(user),
        l::START_FOCUS => TransitionResult::new(
            Reply::options(
                format!(
                    "Focus started! I will keep your time guard for {} minutes",
                    user.focus_duration_mins
                ),
                l::in_focus_keyboard(),
            ),
            UserAction::new(Menu::InFocus),
        )
        .with_effect(Effect::start_focus(user)),
        l::START_BREAK => TransitionResult::new(
            Reply::options(
                format!(
                    "Break started! I will keep your time guard for {} minutes",
                    user.break_duration_mins
                ),
                l::in_break_keyboard(),
            ),
            UserAction::new(Menu::InBreak),
        )
        .with_effect(Effect::start_break(user)),
        l::SETTINGS => TransitionResult::new(
            Reply::options("Settings", l::settings_keyboard()),
            UserAction::new(Menu::Settings),
        ),
        _ => unrecognized(user),
    }
}

fn in_session(
    text: &str,
    user: &User,
    session: Option<ActiveSession>,
    kind: SessionKind,
) -> TransitionResult {
    let stop_label = match kind {
        SessionKind::Focus => l::STOP_FOCUS,
        SessionKind::Break => l::STOP_BREAK,
    };

    if text == stop_label {
        if session.is_none() {
            return nothing_active(user);
        }
        let stopped = match kind {
            SessionKind::Focus => "Focus stopped",
            SessionKind::Break => "Break stopped",
        };
        return to_main_menu(stopped).with_effect(Effect::StopSession);
    }

    if text == l::TIME_LEFT {
        return match session {
            Some(active) => TransitionResult::stay(
                Reply::options(
                    format!("Time left: {}", format_remaining(active.seconds_left)),
                    keyboard_for(user.last_action.menu, user),
                ),
                user,
            ),
            None => nothing_active(user),
        };
    }

    unrecognized(user)
}

// ============================================================================
// Settings
// ============================================================================

fn settings(text: &str, user: &User) -> TransitionResult {
    match text {
        l::FOCUS_DURATION => TransitionResult::new(
            Reply::options(
                format!(
                    "Your current focus duration is {} minutes. Do you want to change it?",
                    user.focus_duration_mins
                ),
                l::focus_duration_keyboard(),
            ),
            UserAction::new(Menu::SettingsFocusDuration),
        ),
        l::BREAK_DURATION => TransitionResult::new(
            Reply::options(
                format!(
                    "Your current break duration is {} minutes. Do you want to change it?",
                    user.break_duration_mins
                ),
                l::break_duration_keyboard(),
            ),
            UserAction::new(Menu::SettingsBreakDuration),
        ),
        l::WORKDAY => to_workday("Choose task to edit", user),
        l::MAIN_MENU => to_main_menu("Main menu"),
        _ => unrecognized(user),
    }
}

fn back_to_settings() -> TransitionResult {
    TransitionResult::new(
        Reply::options("Going back to the settings menu", l::settings_keyboard()),
        UserAction::new(Menu::Settings),
    )
}

fn focus_duration(text: &str, user: &User) -> TransitionResult {
    if user.last_action.step == Step::ChooseFocusDuration {
        let mut updated = user.clone();
        return match l::focus_minutes(text).map(|m| updated.set_focus_duration(m)) {
            Some(Ok(())) => to_main_menu(format!(
                "Your focus duration is now {} minutes! Going back to the main menu",
                updated.focus_duration_mins
            ))
            .with_effect(Effect::SaveUser(updated)),
            _ => TransitionResult::stay(Reply::options(WRONG_VALUE, focus_options()), user),
        };
    }

    match text {
        l::CHANGE_FOCUS_DURATION => TransitionResult::new(
            Reply::options("Choose new focus duration", focus_options()),
            UserAction::with_step(Menu::SettingsFocusDuration, Step::ChooseFocusDuration),
        ),
        l::BACK => back_to_settings(),
        _ => unrecognized(user),
    }
}

fn break_duration(text: &str, user: &User) -> TransitionResult {
    if user.last_action.step == Step::ChooseBreakDuration {
        let mut updated = user.clone();
        return match l::break_minutes(text).map(|m| updated.set_break_duration(m)) {
            Some(Ok(())) => to_main_menu(format!(
                "Your break duration is now {} minutes! Going back to the main menu",
                updated.break_duration_mins
            ))
            .with_effect(Effect::SaveUser(updated)),
            _ => TransitionResult::stay(Reply::options(WRONG_VALUE, l::break_options()), user),
        };
    }

    match text {
        l::CHANGE_BREAK_DURATION => TransitionResult::new(
            Reply::options("Choose new break duration", l::break_options()),
            UserAction::with_step(Menu::SettingsBreakDuration, Step::ChooseBreakDuration),
        ),
        l::BACK => back_to_settings(),
        _ => unrecognized(user),
    }
}

// ============================================================================
// Workday
// ============================================================================

fn to_workday(text: impl Into<String>, user: &User) -> TransitionResult {
    TransitionResult::new(
        Reply::options(text, l::workday_keyboard(user.workday.task_names())),
        UserAction::new(Menu::SettingsWorkday),
    )
}

fn internal_error(user: &User) -> TransitionResult {
    to_workday(INTERNAL_ERROR, user)
}

/// Trimmed task name, or `None` when it can't be used as one
fn task_name_input(text: &str) -> Option<&str> {
    let name = text.trim();
    let len = name.chars().count();
    if len == 0
        || len > MAX_TASK_NAME_CHARS
        || name.starts_with('/')
        || l::WORKDAY_RESERVED.contains(&name)
    {
        return None;
    }
    Some(name)
}

fn invalid_task_name() -> String {
    format!(
        "Task name should have from 1 to {MAX_TASK_NAME_CHARS} characters, \
         can't start with '/' and can't be a menu option. Please enter another name"
    )
}

/// Parse a focus period count, or the message explaining why not
fn periods_input(text: &str) -> Result<u8, &'static str> {
    let periods: i64 = text.trim().parse().map_err(|_| INVALID_INPUT)?;
    u8::try_from(periods)
        .ok()
        .filter(|p| (MIN_FOCUS_PERIODS..=MAX_FOCUS_PERIODS).contains(p))
        .ok_or("Number of periods should be greater than 0 and less than 10")
}

fn workday(text: &str, user: &User) -> TransitionResult {
    match &user.last_action.step {
        Step::NewTaskName => {
            let Some(name) = task_name_input(text) else {
                return TransitionResult::stay(Reply::text(invalid_task_name()), user);
            };
            match user.workday.check_new_task(name) {
                Ok(()) => TransitionResult::new(
                    Reply::options(
                        format!(
                            "Created task {name}, please select how many focus periods do you want to spend on it?"
                        ),
                        l::period_options(),
                    ),
                    UserAction::with_step(
                        Menu::SettingsWorkday,
                        Step::NewTaskPeriods {
                            task_name: name.to_string(),
                        },
                    ),
                ),
                Err(WorkdayError::CapacityReached) => to_workday(TASKS_FULL, user),
                Err(_) => to_workday(TASK_EXISTS, user),
            }
        }
        Step::NewTaskPeriods { task_name } => {
            let periods = match periods_input(text) {
                Ok(periods) => periods,
                Err(message) => {
                    return TransitionResult::stay(
                        Reply::options(message, l::period_options()),
                        user,
                    )
                }
            };
            let mut updated = user.clone();
            match updated.workday.add_task(Task::new(task_name.clone(), periods)) {
                Ok(()) => to_workday(
                    "Task created, please choose another task to edit or go back to main menu",
                    &updated,
                )
                .with_effect(Effect::SaveUser(updated)),
                Err(WorkdayError::CapacityReached) => to_workday(TASKS_FULL, user),
                Err(_) => to_workday(TASK_EXISTS, user),
            }
        }
        _ => match text {
            l::MAIN_MENU => to_main_menu("Main menu"),
            l::ADD_TASK if user.workday.is_full() => to_workday(TASKS_FULL, user),
            l::ADD_TASK => TransitionResult::new(
                Reply::text("Please enter task name"),
                UserAction::with_step(Menu::SettingsWorkday, Step::NewTaskName),
            ),
            _ => match user.workday.task_by_name(text) {
                Ok(task) => open_task(task),
                Err(_) => unrecognized(user),
            },
        },
    }
}

fn open_task(task: &Task) -> TransitionResult {
    selected(
        format!("Task: {}, Focus Periods: {}", task.name, task.focus_periods),
        &task.name,
    )
}

/// Back in the task editor with `task_name` open
fn selected(text: impl Into<String>, task_name: &str) -> TransitionResult {
    TransitionResult::new(
        Reply::options(text, l::task_edit_keyboard()),
        UserAction::with_step(
            Menu::SettingsWorkdayTaskEdit,
            Step::TaskSelected {
                task_name: task_name.to_string(),
            },
        ),
    )
}

/// Numbered task list with `selected` in bold
fn positions_text(selected: &str, task_names: &[String]) -> String {
    task_names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let line = format!("{}. {}", i + 1, escape_html(name));
            if name == selected {
                format!("<b>{line}</b>\n")
            } else {
                format!("{line}\n")
            }
        })
        .collect()
}

fn task_edit(text: &str, user: &User) -> TransitionResult {
    let Some(task_name) = user.last_action.step.task_name() else {
        return to_workday("Choose task to edit", user);
    };
    let Ok(task) = user.workday.task_by_name(task_name) else {
        tracing::warn!(task_name, "Task selected for editing no longer exists");
        return internal_error(user);
    };

    match &user.last_action.step {
        Step::RenameTask { .. } => rename_task(text, user, task),
        Step::TaskPeriods { .. } => change_periods(text, user, task_name),
        Step::TaskOrder { .. } => reorder_task(text, user, task_name),
        _ => match text {
            l::EDIT_TASK_NAME => TransitionResult::new(
                Reply::text("Please enter new task name"),
                UserAction::with_step(
                    Menu::SettingsWorkdayTaskEdit,
                    Step::RenameTask {
                        task_name: task_name.to_string(),
                    },
                ),
            ),
            l::EDIT_TASK_PERIODS => TransitionResult::new(
                Reply::options(
                    "Please select number of focus periods for this task",
                    l::period_options(),
                ),
                UserAction::with_step(
                    Menu::SettingsWorkdayTaskEdit,
                    Step::TaskPeriods {
                        task_name: task_name.to_string(),
                    },
                ),
            ),
            l::EDIT_TASK_ORDER => {
                let names = user.workday.task_names();
                TransitionResult::new(
                    Reply::html(
                        format!(
                            "Please select new position for the task\n{}",
                            positions_text(task_name, &names)
                        ),
                        l::position_options(names.len()),
                    ),
                    UserAction::with_step(
                        Menu::SettingsWorkdayTaskEdit,
                        Step::TaskOrder {
                            task_name: task_name.to_string(),
                        },
                    ),
                )
            }
            l::DELETE_TASK => {
                let mut updated = user.clone();
                match updated.workday.delete_task(task_name) {
                    Ok(removed) => to_workday(format!("Task {} deleted", removed.name), &updated)
                        .with_effect(Effect::SaveUser(updated)),
                    Err(_) => internal_error(user),
                }
            }
            l::BACK => to_workday("Choose task to edit", user),
            l::MAIN_MENU => to_main_menu("Main menu"),
            _ => unrecognized(user),
        },
    }
}

fn rename_task(text: &str, user: &User, task: &Task) -> TransitionResult {
    let Some(new_name) = task_name_input(text) else {
        return TransitionResult::stay(Reply::text(invalid_task_name()), user);
    };
    let mut updated = user.clone();
    match updated
        .workday
        .update_task(&task.name, Task::new(new_name, task.focus_periods))
    {
        Ok(()) => selected(
            format!("Updated task name to the {new_name}, what do you want to do next?"),
            new_name,
        )
        .with_effect(Effect::SaveUser(updated)),
        Err(WorkdayError::DuplicateTask(_)) => selected(TASK_EXISTS, &task.name),
        Err(_) => internal_error(user),
    }
}

fn change_periods(text: &str, user: &User, task_name: &str) -> TransitionResult {
    let periods = match periods_input(text) {
        Ok(periods) => periods,
        Err(message) => {
            return TransitionResult::stay(Reply::options(message, l::period_options()), user)
        }
    };
    let mut updated = user.clone();
    match updated
        .workday
        .update_task(task_name, Task::new(task_name, periods))
    {
        Ok(()) => selected(
            format!("Updated task periods to the {periods}, what do you want to do next?"),
            task_name,
        )
        .with_effect(Effect::SaveUser(updated)),
        Err(_) => internal_error(user),
    }
}

fn reorder_task(text: &str, user: &User, task_name: &str) -> TransitionResult {
    let len = user.workday.len();
    let position = match text.trim().parse::<usize>() {
        Err(_) => Err(INVALID_INPUT.to_string()),
        Ok(p) if !(1..=len).contains(&p) => Err(format!("Task order should be between 1 and {len}")),
        Ok(p) => Ok(p),
    };
    let position = match position {
        Ok(position) => position,
        Err(message) => {
            return TransitionResult::stay(
                Reply::options(message, l::position_options(len)),
                user,
            )
        }
    };
    let mut updated = user.clone();
    match updated.workday.set_task_position(task_name, position - 1) {
        Ok(()) => {
            let order = positions_text(task_name, &updated.workday.task_names());
            let reply = Reply::html(
                format!("Updated task order!\n{order}Please select what do you want to do next?"),
                l::task_edit_keyboard(),
            );
            TransitionResult::new(
                reply,
                UserAction::with_step(
                    Menu::SettingsWorkdayTaskEdit,
                    Step::TaskSelected {
                        task_name: task_name.to_string(),
                    },
                ),
            )
            .with_effect(Effect::SaveUser(updated))
        }
        Err(_) => internal_error(user),
    }
}
