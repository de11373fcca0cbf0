//! HTTP and WebSocket transports
//!
//! Both transports feed the same [`Dispatcher`]:
//! - `GET /ws`: streaming chat, one session per connection
//! - `POST /voice`: telephony webhook, one throwaway session per request

mod types;
mod voice;
mod ws;

pub use types::*;

use crate::dispatch::Dispatcher;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    /// Cancelled on server shutdown; each connection derives a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, shutdown: CancellationToken) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            shutdown,
        }
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::chat_socket))
        .route("/voice", post(voice::voice_webhook))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::{dispatcher, MockLlmClient};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health() {
        let state = AppState::new(
            dispatcher(Arc::new(MockLlmClient::new("mock"))),
            CancellationToken::new(),
        );
        let response = create_router(state)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"ok");
    }
}
