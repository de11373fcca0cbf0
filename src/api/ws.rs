//! Streaming chat over WebSocket
//!
//! One session per connection. Rounds run strictly one after another: the
//! next frame is not read until the current reply has been sent.

use super::{AppState, ChatFrame};
use crate::dispatch::Dispatcher;
use crate::session::Session;
use crate::state_machine::{transition, ConvState, Event};
use crate::system_prompt::chat_prompt;
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::SinkExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
#[error("channel error: {0}")]
pub struct ChannelError(pub String);

/// Bidirectional text channel carrying chat frames
#[async_trait]
pub trait ChatChannel: Send {
    /// Next text payload. `None` once the peer has closed.
    async fn next_text(&mut self) -> Option<Result<String, ChannelError>>;

    async fn send_frame(&mut self, frame: &ChatFrame) -> Result<(), ChannelError>;

    async fn close_channel(&mut self);
}

#[async_trait]
impl ChatChannel for WebSocket {
    async fn next_text(&mut self) -> Option<Result<String, ChannelError>> {
        loop {
            match self.recv().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                // Pings are answered by axum; binary frames carry nothing for us
                Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_)) => {}
                Err(e) => return Some(Err(ChannelError(e.to_string()))),
            }
        }
    }

    async fn send_frame(&mut self, frame: &ChatFrame) -> Result<(), ChannelError> {
        let payload = serde_json::to_string(frame).map_err(|e| ChannelError(e.to_string()))?;
        self.send(Message::Text(payload))
            .await
            .map_err(|e| ChannelError(e.to_string()))
    }

    async fn close_channel(&mut self) {
        if let Err(e) = SinkExt::close(self).await {
            tracing::debug!(error = %e, "WebSocket close failed");
        }
    }
}

pub async fn chat_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |mut socket| async move {
        let cancel = state.shutdown.child_token();
        run_stream(&mut socket, &state.dispatcher, &cancel).await;
    })
}

/// Drive one connection until the peer leaves, a round fails, or `cancel`
/// fires. Returns the final transcript.
pub async fn run_stream<C: ChatChannel>(
    channel: &mut C,
    dispatcher: &Dispatcher,
    cancel: &CancellationToken,
) -> Session {
    let mut session = Session::new(chat_prompt());
    let mut state = ConvState::AwaitingInput;
    tracing::info!(session_id = %session.id(), "Chat session opened");

    while state != ConvState::Closed {
        let inbound = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            inbound = channel.next_text() => inbound,
        };

        let raw = match inbound {
            Some(Ok(raw)) => raw,
            Some(Err(e)) => {
                tracing::warn!(session_id = %session.id(), error = %e, "Receive failed");
                break;
            }
            None => break,
        };

        let frame: ChatFrame = match serde_json::from_str(&raw) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(session_id = %session.id(), error = %e, "Ignoring malformed frame");
                continue;
            }
        };

        state = advance(state, Event::Inbound);

        let (reply, event) = match dispatcher.round(&mut session, frame.text, cancel).await {
            Ok(reply) => (reply, Event::Replied),
            Err(e) if e.is_recoverable() => {
                tracing::warn!(session_id = %session.id(), error = %e, "Round recovered with fallback");
                (e.fallback_reply().to_string(), Event::Replied)
            }
            Err(e) => {
                tracing::error!(session_id = %session.id(), error = %e, "Round failed, closing");
                (e.fallback_reply().to_string(), Event::Failed)
            }
        };

        if let Err(e) = channel.send_frame(&ChatFrame::new(reply)).await {
            tracing::warn!(session_id = %session.id(), error = %e, "Send failed");
            break;
        }

        state = advance(state, event);
    }

    channel.close_channel().await;
    tracing::info!(
        session_id = %session.id(),
        messages = session.messages().len(),
        state = ?advance(state, Event::Disconnected),
        "Chat session closed"
    );

    session
}

/// The loop above only issues legal events; a rejected one closes the
/// connection rather than continuing in an unknown state.
fn advance(state: ConvState, event: Event) -> ConvState {
    transition(state, event).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Unexpected state transition");
        ConvState::Closed
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::{dispatcher, HangingLlmClient, MockLlmClient};
    use crate::dispatch::{FALLBACK_REPLY, SHUTDOWN_REPLY};
    use crate::llm::{ChatMessage, LlmError, LlmResponse, MessageRole, ToolCall};
    use crate::tools::StoreTools;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    fn hanging_dispatcher(timeout: Duration) -> Dispatcher {
        Dispatcher::new(
            Arc::new(HangingLlmClient),
            StoreTools::new(Arc::default()),
            timeout,
        )
    }

    /// In-memory channel: replays scripted inbound payloads, then reports the
    /// peer as gone.
    #[derive(Default)]
    struct MockChannel {
        inbound: VecDeque<Result<String, ChannelError>>,
        sent: Vec<String>,
        closed: bool,
    }

    impl MockChannel {
        fn with_texts(texts: &[&str]) -> Self {
            Self {
                inbound: texts.iter().map(|t| Ok((*t).to_string())).collect(),
                ..Self::default()
            }
        }

        fn sent_frames(&self) -> Vec<ChatFrame> {
            self.sent
                .iter()
                .map(|s| serde_json::from_str(s).unwrap())
                .collect()
        }
    }

    #[async_trait]
    impl ChatChannel for MockChannel {
        async fn next_text(&mut self) -> Option<Result<String, ChannelError>> {
            self.inbound.pop_front()
        }

        async fn send_frame(&mut self, frame: &ChatFrame) -> Result<(), ChannelError> {
            self.sent.push(serde_json::to_string(frame).unwrap());
            Ok(())
        }

        async fn close_channel(&mut self) {
            self.closed = true;
        }
    }

    #[tokio::test]
    async fn test_hours_round_end_to_end() {
        let llm = Arc::new(MockLlmClient::new("mock"));
        llm.queue_response(LlmResponse::tool_calls(vec![ToolCall::new(
            "call_1",
            "lookup_hours_multiple",
            json!({"days": ["thursday", "sunday"]}),
        )]));
        let dispatcher = dispatcher(llm);
        let mut channel =
            MockChannel::with_texts(&[r#"{"text":"what are your hours on thursday and sunday?"}"#]);

        run_stream(&mut channel, &dispatcher, &CancellationToken::new()).await;

        assert_eq!(
            channel.sent,
            [r#"{"text":"Here are the store hours for the requested days:\nThursday: 9:00 AM - 8:00 PM\nSunday: Closed"}"#]
        );
        assert!(channel.closed);
    }

    #[tokio::test]
    async fn test_transcript_grows_by_two_per_round() {
        let llm = Arc::new(MockLlmClient::new("mock"));
        for reply in ["hi!", "we sell hookahs", "bye!"] {
            llm.queue_response(LlmResponse::text(reply));
        }
        let dispatcher = dispatcher(llm);
        let mut channel = MockChannel::with_texts(&[
            r#"{"text":"hello"}"#,
            r#"{"text":"what do you sell?"}"#,
            r#"{"text":"thanks"}"#,
        ]);

        let session = run_stream(&mut channel, &dispatcher, &CancellationToken::new()).await;

        let messages = session.messages();
        assert_eq!(messages.len(), 1 + 2 * 3);
        assert_eq!(messages[0].role, MessageRole::System);
        let contents: Vec<_> = messages[1..].iter().map(|m| m.content.as_str()).collect();
        assert_eq!(
            contents,
            ["hello", "hi!", "what do you sell?", "we sell hookahs", "thanks", "bye!"]
        );
        assert_eq!(
            channel.sent_frames(),
            [
                ChatFrame::new("hi!"),
                ChatFrame::new("we sell hookahs"),
                ChatFrame::new("bye!")
            ]
        );
    }

    #[tokio::test]
    async fn test_malformed_frame_is_skipped() {
        let llm = Arc::new(MockLlmClient::new("mock"));
        llm.queue_response(LlmResponse::text("hello there"));
        let dispatcher = dispatcher(llm.clone());
        let mut channel = MockChannel::with_texts(&["not json", r#"{"msg":"x"}"#, r#"{"text":"hi"}"#]);

        let session = run_stream(&mut channel, &dispatcher, &CancellationToken::new()).await;

        assert_eq!(session.messages().len(), 3);
        assert_eq!(channel.sent_frames(), [ChatFrame::new("hello there")]);
        assert_eq!(llm.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_llm_failure_sends_fallback_and_closes() {
        let llm = Arc::new(MockLlmClient::new("mock"));
        llm.queue_error(LlmError::auth("bad key"));
        llm.queue_response(LlmResponse::text("never sent"));
        let dispatcher = dispatcher(llm.clone());
        let mut channel = MockChannel::with_texts(&[r#"{"text":"hi"}"#, r#"{"text":"still there?"}"#]);

        let session = run_stream(&mut channel, &dispatcher, &CancellationToken::new()).await;

        assert_eq!(channel.sent_frames(), [ChatFrame::new(FALLBACK_REPLY)]);
        assert!(channel.closed);
        assert_eq!(llm.recorded_requests().len(), 1);
        // The second frame was never read
        assert_eq!(channel.inbound.len(), 1);
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_answers_with_fallback_and_stays_open() {
        let dispatcher = hanging_dispatcher(Duration::from_millis(10));
        let mut channel = MockChannel::with_texts(&[r#"{"text":"hi"}"#, r#"{"text":"hello?"}"#]);

        let session = run_stream(&mut channel, &dispatcher, &CancellationToken::new()).await;

        // Both frames were read and answered; the loop ended only when the peer left
        assert_eq!(
            channel.sent_frames(),
            [ChatFrame::new(FALLBACK_REPLY), ChatFrame::new(FALLBACK_REPLY)]
        );
        assert!(channel.inbound.is_empty());
        assert_eq!(session.messages().len(), 1 + 2 * 2);
        assert_eq!(session.messages()[4], ChatMessage::assistant(FALLBACK_REPLY));
    }

    #[tokio::test]
    async fn test_shutdown_mid_round_sends_notice_and_closes() {
        let dispatcher = hanging_dispatcher(Duration::from_secs(60));
        let mut channel = MockChannel::with_texts(&[r#"{"text":"hi"}"#, r#"{"text":"still there?"}"#]);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let session = run_stream(&mut channel, &dispatcher, &cancel).await;

        assert_eq!(channel.sent_frames(), [ChatFrame::new(SHUTDOWN_REPLY)]);
        assert!(channel.closed);
        assert_eq!(channel.inbound.len(), 1);
        assert_eq!(session.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_receive_error_ends_session() {
        let llm = Arc::new(MockLlmClient::new("mock"));
        let dispatcher = dispatcher(llm.clone());
        let mut channel = MockChannel {
            inbound: VecDeque::from([Err(ChannelError("reset".to_string()))]),
            ..MockChannel::default()
        };

        let session = run_stream(&mut channel, &dispatcher, &CancellationToken::new()).await;

        assert!(channel.sent.is_empty());
        assert!(channel.closed);
        assert_eq!(session.messages().len(), 1);
        assert!(llm.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_stops_reading() {
        let llm = Arc::new(MockLlmClient::new("mock"));
        let dispatcher = dispatcher(llm.clone());
        let mut channel = MockChannel::with_texts(&[r#"{"text":"hi"}"#]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let session = run_stream(&mut channel, &dispatcher, &cancel).await;

        assert!(channel.closed);
        assert_eq!(session.messages().len(), 1);
        assert!(llm.recorded_requests().is_empty());
    }
}
