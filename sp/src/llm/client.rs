//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// Implementations make exactly one HTTP attempt per call. Retries, backoff
/// and tool round trips belong to [`super::InferenceCaller`].
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing::debug;

    type Handler = Box<dyn Fn(usize, &CompletionRequest) -> Result<CompletionResponse, LlmError> + Send + Sync>;

    /// Mock LLM client for unit tests
    ///
    /// Each call is answered by a handler that sees the call index and the
    /// request; every request is recorded for later inspection.
    pub struct MockLlmClient {
        handler: Handler,
        call_count: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlmClient {
        /// Answer calls with `responses` in order, then fail
        pub fn new(responses: Vec<CompletionResponse>) -> Self {
            debug!(response_count = %responses.len(), "MockLlmClient::new: called");
            Self::with_handler(move |idx, _| {
                responses
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| LlmError::InvalidResponse("No more mock responses".to_string()))
            })
        }

        pub fn with_handler(
            handler: impl Fn(usize, &CompletionRequest) -> Result<CompletionResponse, LlmError> + Send + Sync + 'static,
        ) -> Self {
            Self {
                handler: Box::new(handler),
                call_count: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmClient for MockLlmClient {
        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            debug!(%idx, "MockLlmClient::complete: called");
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request.clone());
            }
            (self.handler)(idx, &request)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn request() -> CompletionRequest {
            CompletionRequest {
                system_prompt: String::new(),
                messages: vec![],
                tools: vec![],
                max_tokens: 1000,
                temperature: None,
            }
        }

        #[tokio::test]
        async fn test_mock_client_returns_responses() {
            let client = MockLlmClient::new(vec![
                CompletionResponse::text("Response 1"),
                CompletionResponse::text("Response 2"),
            ]);

            let resp1 = client.complete(request()).await.unwrap();
            assert_eq!(resp1.content, Some("Response 1".to_string()));

            let resp2 = client.complete(request()).await.unwrap();
            assert_eq!(resp2.content, Some("Response 2".to_string()));

            assert_eq!(client.call_count(), 2);
            assert_eq!(client.requests().len(), 2);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockLlmClient::new(vec![]);
            assert!(client.complete(request()).await.is_err());
        }
    }
}
