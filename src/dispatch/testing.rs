//! Mock completion clients for testing
//!
//! These mocks let rounds and transports run without network I/O.

use super::Dispatcher;
use crate::catalog::Catalog;
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use crate::tools::StoreTools;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Dispatcher over the default catalog with a generous timeout
pub fn dispatcher(llm: Arc<dyn LlmService>) -> Dispatcher {
    Dispatcher::new(
        llm,
        StoreTools::new(Arc::new(Catalog::default())),
        Duration::from_secs(5),
    )
}

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// LLM client that never answers
pub struct HangingLlmClient;

#[async_trait]
impl LlmService for HangingLlmClient {
    async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        std::future::pending().await
    }

    fn model_id(&self) -> &str {
        "hanging"
    }
}
