//! Effects produced by menu transitions

use crate::timer::SessionKind;
use crate::user::User;

/// Side effects the dispatcher executes after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write the updated record back to the store
    SaveUser(User),

    /// Start a countdown for the chat
    StartSession { kind: SessionKind, minutes: u32 },

    /// Stop the chat's running countdown
    StopSession,
}

impl Effect {
    pub fn start_focus(user: &User) -> Self {
        Effect::StartSession {
            kind: SessionKind::Focus,
            minutes: user.focus_duration_mins,
        }
    }

    pub fn start_break(user: &User) -> Self {
        Effect::StartSession {
            kind: SessionKind::Break,
            minutes: user.break_duration_mins,
        }
    }
}
