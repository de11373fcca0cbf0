//! Dispatch loop: turns one inbound utterance into one reply
//!
//! A round appends the user message, asks the completion service for either
//! a text answer or a tool call, runs the first requested tool against the
//! catalog, appends the reply, and hands it back to the transport.

#[cfg(test)]
pub mod testing;

use crate::llm::{Completion, LlmError, LlmRequest, LlmService, ToolCall, ToolChoice};
use crate::session::Session;
use crate::tools::{StoreTools, ToolError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Spoken or sent when the completion service fails or stalls
pub const FALLBACK_REPLY: &str =
    "Sorry, I'm having trouble answering right now. Please try again in a moment.";

/// Sent when the server is shutting down mid-round
pub const SHUTDOWN_REPLY: &str = "We're closing up for a moment. Please reconnect shortly.";

/// Reply used when the model asks for a tool we don't have
pub const UNSUPPORTED_TOOL_REPLY: &str = "Sorry, I can't help with that request right now.";

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("completion service failed: {0}")]
    Llm(#[from] LlmError),
    #[error("completion service did not answer within {0:?}")]
    Timeout(Duration),
    #[error("round cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Whether the connection can keep going after this error. A timed-out
    /// round has already recorded the fallback reply in the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DispatchError::Timeout(_))
    }

    /// User-facing text for this failure
    pub fn fallback_reply(&self) -> &'static str {
        match self {
            DispatchError::Llm(_) | DispatchError::Timeout(_) => FALLBACK_REPLY,
            DispatchError::Cancelled => SHUTDOWN_REPLY,
        }
    }
}

/// Shared round executor. One instance serves every connection; all
/// per-conversation state lives in the [`Session`] passed to [`Dispatcher::round`].
pub struct Dispatcher {
    llm: Arc<dyn LlmService>,
    tools: StoreTools,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(llm: Arc<dyn LlmService>, tools: StoreTools, timeout: Duration) -> Self {
        Self {
            llm,
            tools,
            timeout,
        }
    }

    /// Run one round. On success the session has grown by exactly one user
    /// and one assistant message.
    pub async fn round(
        &self,
        session: &mut Session,
        text: impl Into<String>,
        cancel: &CancellationToken,
    ) -> Result<String, DispatchError> {
        session.push_user(text);

        let request = LlmRequest {
            messages: session.messages().to_vec(),
            tools: self.tools.definitions(),
            tool_choice: ToolChoice::Auto,
        };

        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DispatchError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.llm.complete(&request)) => {
                if let Ok(response) = result {
                    response?
                } else {
                    tracing::warn!(
                        session_id = %session.id(),
                        timeout_ms = %self.timeout.as_millis(),
                        "Completion timed out, answering with fallback"
                    );
                    session.push_assistant(FALLBACK_REPLY);
                    return Err(DispatchError::Timeout(self.timeout));
                }
            }
        };

        let reply = match response.completion {
            Completion::Text(text) => text,
            Completion::ToolCalls(calls) => self.run_first_tool(session, &calls),
        };

        session.push_assistant(reply.clone());
        Ok(reply)
    }

    /// Execute the first requested call. Additional calls in the same
    /// response are dropped.
    fn run_first_tool(&self, session: &Session, calls: &[ToolCall]) -> String {
        let Some((call, rest)) = calls.split_first() else {
            tracing::warn!(session_id = %session.id(), "Model returned an empty tool call list");
            return UNSUPPORTED_TOOL_REPLY.to_string();
        };

        if !rest.is_empty() {
            tracing::debug!(
                session_id = %session.id(),
                dropped = rest.len(),
                "Ignoring extra tool calls"
            );
        }

        match self.tools.execute(&call.name, &call.arguments) {
            Ok(result) => {
                tracing::info!(
                    session_id = %session.id(),
                    tool = %call.name,
                    "Executed catalog tool"
                );
                result
            }
            Err(ToolError::Unsupported(name)) => {
                tracing::warn!(session_id = %session.id(), tool = %name, "Model requested unsupported tool");
                UNSUPPORTED_TOOL_REPLY.to_string()
            }
        }
    }
}
