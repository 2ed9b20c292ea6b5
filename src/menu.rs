//! Conversation menu state machine
//!
//! Follows the Elm Architecture: [`process`] is a pure function from the
//! inbound text and current user record to a reply, the next position and a
//! list of [`Effect`]s. The runtime executes the effects.

mod effect;
pub mod labels;
mod reply;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
#[allow(unused_imports)] // Public API re-exports
pub use reply::{Keyboard, Reply, TextFormat};
pub use state::{Menu, Step, UserAction};
pub use transition::{
    nothing_active, onboard, process, session_conflict, unknown_user, TransitionResult,
};
