//! API request and response types

use crate::timer::{format_remaining, ActiveSession, SessionKind};
use crate::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inbound chat message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    #[serde(default)]
    pub first_name: String,
    pub text: String,
}

/// Stored user record plus the running session, if any
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub user: User,
    pub session: Option<SessionView>,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub kind: SessionKind,
    pub seconds_left: u32,
    /// e.g. "12 minutes 34 seconds"
    pub remaining: String,
    pub ends_at: DateTime<Utc>,
}

impl SessionView {
    pub fn at(session: ActiveSession, now: DateTime<Utc>) -> Self {
        Self {
            kind: session.kind,
            seconds_left: session.seconds_left,
            remaining: format_remaining(session.seconds_left),
            ends_at: now + chrono::Duration::seconds(i64::from(session.seconds_left)),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
