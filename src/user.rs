//! User records
//!
//! A `User` is created on first contact and mutated by the menu handlers.
//! The in-memory copy lives in [`UserStore`]; the durable copy in the
//! `users` bucket of the database.

mod store;
pub mod workday;

#[allow(unused_imports)] // Public API re-exports
pub use store::{StoreError, UserStore};
pub use workday::{Task, UserWorkday, WorkdayError};

use crate::menu::UserAction;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Focus durations a user may pick, in minutes
pub const FOCUS_DURATIONS: [u32; 4] = [15, 30, 45, 60];
/// Break durations a user may pick, in minutes
pub const BREAK_DURATIONS: [u32; 4] = [5, 10, 15, 20];

pub const DEFAULT_FOCUS_MINS: u32 = 15;
pub const DEFAULT_BREAK_MINS: u32 = 5;

/// Stable identity of one user's conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidDuration {
    #[error("invalid focus duration [{0}]")]
    Focus(u32),
    #[error("invalid break duration [{0}]")]
    Break(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub first_name: String,
    #[serde(rename = "focus_duration")]
    pub focus_duration_mins: u32,
    #[serde(rename = "break_duration")]
    pub break_duration_mins: u32,
    #[serde(default)]
    pub last_action: UserAction,
    #[serde(default)]
    pub workday: UserWorkday,
}

impl User {
    /// A freshly created user, about to go through onboarding
    pub fn new(first_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            focus_duration_mins: DEFAULT_FOCUS_MINS,
            break_duration_mins: DEFAULT_BREAK_MINS,
            last_action: UserAction::onboarding(),
            workday: UserWorkday::default(),
        }
    }

    pub fn set_focus_duration(&mut self, minutes: u32) -> Result<(), InvalidDuration> {
        if !FOCUS_DURATIONS.contains(&minutes) {
            return Err(InvalidDuration::Focus(minutes));
        }
        self.focus_duration_mins = minutes;
        Ok(())
    }

    pub fn set_break_duration(&mut self, minutes: u32) -> Result<(), InvalidDuration> {
        if !BREAK_DURATIONS.contains(&minutes) {
            return Err(InvalidDuration::Break(minutes));
        }
        self.break_duration_mins = minutes;
        Ok(())
    }
}
