//! HTTP API for Horae
//!
//! Inbound messages arrive as JSON, replies go back in the response body and
//! out through the configured notifiers. Per-chat SSE streams follow the
//! broadcast hub.

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::notify::BroadcastNotifier;
use crate::runtime::Dispatcher;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub broadcast: BroadcastNotifier,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, broadcast: BroadcastNotifier) -> Self {
        Self {
            dispatcher,
            broadcast,
        }
    }
}
