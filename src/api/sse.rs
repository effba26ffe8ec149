//! Server-Sent Events for a streamed turn

use crate::conversation::Message;
use crate::session::ResponseSink;
use async_trait::async_trait;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

/// Progress of one turn as seen by the page
#[derive(Debug, Clone)]
pub enum TurnEvent {
    User { message: Message },
    Partial { text: String },
    Error { message: String },
    Done { message: Message },
}

/// Forwards turn progress into a channel drained by the HTTP response.
///
/// If the client goes away the sends fail and the turn still runs to the end.
pub struct ChannelSink {
    tx: mpsc::Sender<TurnEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<TurnEvent>) -> Self {
        Self { tx }
    }

    async fn send(&self, event: TurnEvent) {
        if self.tx.send(event).await.is_err() {
            tracing::debug!("Client disconnected during turn");
        }
    }
}

#[async_trait]
impl ResponseSink for ChannelSink {
    async fn user_turn(&mut self, message: &Message) {
        self.send(TurnEvent::User {
            message: message.clone(),
        })
        .await;
    }

    async fn partial(&mut self, view: &str) {
        self.send(TurnEvent::Partial {
            text: view.to_string(),
        })
        .await;
    }

    async fn error(&mut self, message: &str) {
        self.send(TurnEvent::Error {
            message: message.to_string(),
        })
        .await;
    }

    async fn finished(&mut self, message: &Message) {
        self.send(TurnEvent::Done {
            message: message.clone(),
        })
        .await;
    }
}

/// Convert the turn channel to an SSE response; ends with the turn
pub fn sse_stream(
    rx: mpsc::Receiver<TurnEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = ReceiverStream::new(rx).map(|event| Ok(turn_event_to_axum(event)));

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn turn_event_to_axum(event: TurnEvent) -> Event {
    let (event_type, data) = match event {
        TurnEvent::User { message } => (
            "user",
            json!({
                "type": "user",
                "message": message
            }),
        ),
        TurnEvent::Partial { text } => (
            "partial",
            json!({
                "type": "partial",
                "text": text
            }),
        ),
        TurnEvent::Error { message } => (
            "error",
            json!({
                "type": "error",
                "message": message
            }),
        ),
        TurnEvent::Done { message } => (
            "done",
            json!({
                "type": "done",
                "message": message
            }),
        ),
    };

    Event::default().event(event_type).data(data.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sink_forwards_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut sink = ChannelSink::new(tx);

        sink.user_turn(&Message::user("hola")).await;
        sink.partial("Ho▌").await;
        sink.finished(&Message::assistant("Hola")).await;
        drop(sink);

        assert!(matches!(rx.recv().await, Some(TurnEvent::User { .. })));
        match rx.recv().await {
            Some(TurnEvent::Partial { text }) => assert_eq!(text, "Ho▌"),
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.recv().await {
            Some(TurnEvent::Done { message }) => assert_eq!(message.content(), "Hola"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_sink_survives_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let mut sink = ChannelSink::new(tx);
        sink.partial("nadie escucha").await;
        sink.error("tampoco").await;
    }
}
