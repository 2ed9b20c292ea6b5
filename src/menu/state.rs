//! Conversation position types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Node of the fixed dialog graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Menu {
    MainMenu,
    InitFocus,
    InitBreak,
    InFocus,
    InBreak,
    Settings,
    SettingsFocusDuration,
    SettingsBreakDuration,
    SettingsWorkday,
    SettingsWorkdayTaskEdit,
}

/// Sub-step inside a menu, carrying whatever the flow needs from earlier input
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Step {
    #[default]
    Idle,
    ChooseFocusDuration,
    ChooseBreakDuration,
    /// Waiting for the name of a task about to be created
    NewTaskName,
    /// Name accepted, waiting for the focus period count
    NewTaskPeriods { task_name: String },
    /// A task is open in the task editor
    TaskSelected { task_name: String },
    RenameTask { task_name: String },
    TaskPeriods { task_name: String },
    TaskOrder { task_name: String },
}

impl Step {
    pub fn task_name(&self) -> Option<&str> {
        match self {
            Step::NewTaskPeriods { task_name }
            | Step::TaskSelected { task_name }
            | Step::RenameTask { task_name }
            | Step::TaskPeriods { task_name }
            | Step::TaskOrder { task_name } => Some(task_name),
            Step::Idle
            | Step::ChooseFocusDuration
            | Step::ChooseBreakDuration
            | Step::NewTaskName => None,
        }
    }
}

/// The persisted "program counter" of a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RawUserAction", try_from = "RawUserAction")]
pub struct UserAction {
    pub menu: Menu,
    pub step: Step,
}

impl UserAction {
    pub fn new(menu: Menu) -> Self {
        Self {
            menu,
            step: Step::Idle,
        }
    }

    pub fn with_step(menu: Menu, step: Step) -> Self {
        Self { menu, step }
    }

    pub fn main_menu() -> Self {
        Self::new(Menu::MainMenu)
    }

    /// First step of the onboarding wizard
    pub fn onboarding() -> Self {
        Self::new(Menu::InitFocus)
    }
}

impl Default for UserAction {
    fn default() -> Self {
        Self::main_menu()
    }
}

// ============================================================================
// Stored layout: { current_menu, action, context }
// ============================================================================

const TASK_NAME_KEY: &str = "task_name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RawAction {
    #[default]
    None,
    ChooseFocusDuration,
    ChooseBreakDuration,
    EnterTaskName,
    EnterTaskPeriods,
    EnterTaskOrder,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawUserAction {
    current_menu: Menu,
    #[serde(default)]
    action: RawAction,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    context: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum ActionDecodeError {
    #[error("action [{0}] requires a task name in its context")]
    MissingTaskName(&'static str),
}

impl From<UserAction> for RawUserAction {
    fn from(value: UserAction) -> Self {
        let action = match &value.step {
            Step::Idle | Step::TaskSelected { .. } => RawAction::None,
            Step::ChooseFocusDuration => RawAction::ChooseFocusDuration,
            Step::ChooseBreakDuration => RawAction::ChooseBreakDuration,
            Step::NewTaskName | Step::RenameTask { .. } => RawAction::EnterTaskName,
            Step::NewTaskPeriods { .. } | Step::TaskPeriods { .. } => RawAction::EnterTaskPeriods,
            Step::TaskOrder { .. } => RawAction::EnterTaskOrder,
        };
        let mut context = BTreeMap::new();
        if let Some(name) = value.step.task_name() {
            context.insert(TASK_NAME_KEY.to_string(), name.to_string());
        }
        Self {
            current_menu: value.menu,
            action,
            context,
        }
    }
}

impl TryFrom<RawUserAction> for UserAction {
    type Error = ActionDecodeError;

    fn try_from(mut raw: RawUserAction) -> Result<Self, Self::Error> {
        let task_name = raw.context.remove(TASK_NAME_KEY);
        let require = |name: &'static str| {
            task_name
                .clone()
                .ok_or(ActionDecodeError::MissingTaskName(name))
        };
        let step = match raw.action {
            RawAction::None => match task_name.clone() {
                Some(task_name) => Step::TaskSelected { task_name },
                None => Step::Idle,
            },
            RawAction::ChooseFocusDuration => Step::ChooseFocusDuration,
            RawAction::ChooseBreakDuration => Step::ChooseBreakDuration,
            RawAction::EnterTaskName => match task_name.clone() {
                Some(task_name) => Step::RenameTask { task_name },
                None => Step::NewTaskName,
            },
            RawAction::EnterTaskPeriods => {
                let task_name = require("enter_task_periods")?;
                if raw.current_menu == Menu::SettingsWorkday {
                    Step::NewTaskPeriods { task_name }
                } else {
                    Step::TaskPeriods { task_name }
                }
            }
            RawAction::EnterTaskOrder => Step::TaskOrder {
                task_name: require("enter_task_order")?,
            },
        };
        Ok(Self {
            menu: raw.current_menu,
            step,
        })
    }
}
