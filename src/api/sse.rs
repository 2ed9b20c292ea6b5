//! Server-Sent Events support

use super::types::ChatResponse;
use crate::notify::OutboundMessage;
use crate::user::ChatId;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Init snapshot followed by every outbound message for `chat_id`
pub fn sse_stream(
    chat_id: ChatId,
    init: ChatResponse,
    rx: broadcast::Receiver<OutboundMessage>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move { Ok(json_event("init", &init)) });

    let messages = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(message) if message.chat_id == chat_id => Some(Ok(json_event("message", &message))),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(%chat_id, error = %e, "SSE subscriber lagged");
            None
        }
    });

    Sse::new(init.chain(messages)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn json_event<T: serde::Serialize>(name: &str, payload: &T) -> Event {
    let data = serde_json::to_string(payload).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode SSE payload");
        "{}".to_string()
    });
    Event::default().event(name).data(data)
}
