//! Option labels, commands and keyboard layouts

use super::reply::Keyboard;

pub const START_COMMAND: &str = "/start";
pub const MAIN_COMMAND: &str = "/main";
pub const DURATIONS_COMMAND: &str = "/durations";

pub const MAIN_MENU: &str = "Main menu";
pub const START_FOCUS: &str = "Let's focus";
pub const START_BREAK: &str = "Let's take a break";
pub const SETTINGS: &str = "Settings";
pub const STOP_FOCUS: &str = "Stop focus";
pub const STOP_BREAK: &str = "Stop break";
pub const TIME_LEFT: &str = "Time left";
pub const FOCUS_DURATION: &str = "Focus duration";
pub const BREAK_DURATION: &str = "Break duration";
pub const CHANGE_FOCUS_DURATION: &str = "Change focus duration";
pub const CHANGE_BREAK_DURATION: &str = "Change break duration";
pub const WORKDAY: &str = "Workday";
pub const ADD_TASK: &str = "Add task";
pub const EDIT_TASK_NAME: &str = "Edit task name";
pub const EDIT_TASK_PERIODS: &str = "Edit the amount of periods";
pub const EDIT_TASK_ORDER: &str = "Edit task order";
pub const DELETE_TASK: &str = "Delete task";
pub const BACK: &str = "Back";

pub const FOCUS_OPTIONS: [&str; 4] = ["15 minutes", "30 minutes", "45 minutes", "1 hour"];
pub const BREAK_OPTIONS: [&str; 4] = ["5 minutes", "10 minutes", "15 minutes", "20 minutes"];
pub const PERIOD_OPTIONS: [&str; 5] = ["1", "2", "4", "6", "8"];

/// Labels that share the workday keyboard with task names
pub const WORKDAY_RESERVED: [&str; 3] = [ADD_TASK, MAIN_MENU, BACK];

/// Minutes for a focus duration option
pub fn focus_minutes(label: &str) -> Option<u32> {
    if label == FOCUS_OPTIONS[3] {
        return Some(60);
    }
    FOCUS_OPTIONS[..3]
        .iter()
        .zip(1u32..)
        .find(|(option, _)| **option == label)
        .map(|(_, n)| n * 15)
}

/// Minutes for a break duration option
pub fn break_minutes(label: &str) -> Option<u32> {
    BREAK_OPTIONS
        .iter()
        .zip(1u32..)
        .find(|(option, _)| **option == label)
        .map(|(_, n)| n * 5)
}

pub fn main_keyboard() -> Keyboard {
    Keyboard::persistent([START_FOCUS, START_BREAK, SETTINGS])
}

pub fn in_focus_keyboard() -> Keyboard {
    Keyboard::persistent([TIME_LEFT, STOP_FOCUS])
}

pub fn in_break_keyboard() -> Keyboard {
    Keyboard::persistent([TIME_LEFT, STOP_BREAK])
}

pub fn settings_keyboard() -> Keyboard {
    Keyboard::persistent([FOCUS_DURATION, BREAK_DURATION, WORKDAY, MAIN_MENU])
}

pub fn focus_duration_keyboard() -> Keyboard {
    Keyboard::persistent([CHANGE_FOCUS_DURATION, BACK])
}

pub fn break_duration_keyboard() -> Keyboard {
    Keyboard::persistent([CHANGE_BREAK_DURATION, BACK])
}

pub fn focus_options() -> Keyboard {
    Keyboard::one_time(FOCUS_OPTIONS)
}

pub fn break_options() -> Keyboard {
    Keyboard::one_time(BREAK_OPTIONS)
}

pub fn period_options() -> Keyboard {
    Keyboard::one_time(PERIOD_OPTIONS)
}

/// Task names followed by the workday actions
pub fn workday_keyboard(task_names: Vec<String>) -> Keyboard {
    let mut rows = task_names;
    rows.push(ADD_TASK.to_string());
    rows.push(MAIN_MENU.to_string());
    Keyboard::persistent(rows)
}

pub fn task_edit_keyboard() -> Keyboard {
    Keyboard::persistent([
        EDIT_TASK_NAME,
        EDIT_TASK_PERIODS,
        EDIT_TASK_ORDER,
        DELETE_TASK,
        BACK,
        MAIN_MENU,
    ])
}

/// 1-based positions for a list of `len` tasks
pub fn position_options(len: usize) -> Keyboard {
    Keyboard::one_time((1..=len).map(|i| i.to_string()))
}
