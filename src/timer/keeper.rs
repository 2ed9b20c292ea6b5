//! A single countdown session

use super::SessionKind;
use crate::user::ChatId;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Countdown state for one active focus or break session.
///
/// `Running -> Stopped` is one-way. Whoever flips `stopped` first owns the
/// session end, which makes the completion notification fire at most once
/// even when expiry and a user cancel race.
#[derive(Debug)]
pub struct TimeKeeper {
    chat_id: ChatId,
    kind: SessionKind,
    seconds_left: AtomicU32,
    stopped: AtomicBool,
    cancel: CancellationToken,
}

impl TimeKeeper {
    pub fn new(chat_id: ChatId, kind: SessionKind, minutes: u32) -> Self {
        Self {
            chat_id,
            kind,
            seconds_left: AtomicU32::new(minutes.saturating_mul(60)),
            stopped: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn seconds_left(&self) -> u32 {
        self.seconds_left.load(Ordering::Acquire)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Stop the countdown. Only the first caller gets `true`.
    pub fn stop(&self) -> bool {
        let won = self
            .stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.cancel.cancel();
        }
        won
    }

    /// Tick until the countdown reaches zero or the keeper is stopped.
    ///
    /// Returns `true` only when this task expired the session itself, i.e.
    /// its own `stop()` call won.
    pub(super) async fn run(self: Arc<Self>, tick: Duration) -> bool {
        if self.seconds_left() == 0 {
            return self.stop();
        }

        let mut ticker = interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!(chat_id = %self.chat_id, kind = ?self.kind, "Time keeper cancelled");
                    return false;
                }
                _ = ticker.tick() => {
                    if self.is_stopped() {
                        return false;
                    }
                    let left = self.decrement();
                    tracing::trace!(chat_id = %self.chat_id, left, "Tick");
                    if left == 0 {
                        return self.stop();
                    }
                }
            }
        }
    }

    fn decrement(&self) -> u32 {
        let previous = self
            .seconds_left
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| Some(s.saturating_sub(1)))
            .unwrap_or(0);
        previous.saturating_sub(1)
    }
}
