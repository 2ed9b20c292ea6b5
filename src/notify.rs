//! Outbound message delivery
//!
//! The core hands every reply to a [`Notifier`]. Production wires a
//! [`BroadcastNotifier`] for SSE subscribers and, when an outbound URL is
//! configured, an [`HttpNotifier`] behind a [`RetryingNotifier`].

use crate::menu::Reply;
use crate::runtime::Notifier;
use crate::user::ChatId;
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;

const BROADCAST_CAPACITY: usize = 256;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const BASE_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// One reply addressed to a chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub chat_id: ChatId,
    pub reply: Reply,
}

impl OutboundMessage {
    pub fn new(chat_id: ChatId, reply: Reply) -> Self {
        Self { chat_id, reply }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("rate limited by the outbound endpoint")]
    RateLimited { retry_after: Option<Duration> },
    #[error("outbound endpoint returned status {0}")]
    Status(u16),
    #[error("outbound request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl NotifyError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, NotifyError::RateLimited { .. })
    }
}

// ============================================================================
// Broadcast
// ============================================================================

/// Fans replies out to in-process subscribers (SSE streams)
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<OutboundMessage>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for BroadcastNotifier {
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        // No subscribers is not an error
        let _ = self.tx.send(message.clone());
        Ok(())
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// POSTs each message as JSON to a fixed endpoint
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(message).send().await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(NotifyError::RateLimited {
                retry_after: parse_retry_after(&response),
            });
        }
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        Ok(())
    }
}

// ============================================================================
// Retry
// ============================================================================

/// Retries rate-limited sends with exponential backoff
pub struct RetryingNotifier<N> {
    inner: N,
    max_attempts: u32,
    base_delay: Duration,
}

impl<N: Notifier> RetryingNotifier<N> {
    pub fn new(inner: N, max_attempts: u32) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay: BASE_BACKOFF,
        }
    }

    #[cfg(test)]
    fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Backoff before retry number `attempt` (1-based), with up to 10% jitter
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .min(MAX_BACKOFF);
        let jitter_ms = u64::try_from(exp.as_millis() / 10).unwrap_or(0);
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };
        exp + Duration::from_millis(jitter)
    }
}

#[async_trait]
impl<N: Notifier> Notifier for RetryingNotifier<N> {
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        let mut attempt = 1;
        loop {
            match self.inner.send(message).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = match &e {
                        NotifyError::RateLimited {
                            retry_after: Some(after),
                        } => (*after).min(MAX_BACKOFF),
                        _ => self.backoff(attempt),
                    };
                    tracing::warn!(
                        chat_id = %message.chat_id,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Outbound message rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ============================================================================
// Fanout
// ============================================================================

/// Delivers to every sink; reports the first failure after trying all
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(sinks: Vec<Arc<dyn Notifier>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    async fn send(&self, message: &OutboundMessage) -> Result<(), NotifyError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.send(message).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
