use super::{Fetcher, SourceRequest};
use crate::error::{DataPointError, DataPointResult};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone)]
enum MockResponse {
    Body(JsonValue),
    Failure { status: u16, message: String },
}

/// In-memory fetcher that replies per URL and records every request.
///
/// Unknown URLs fail with a 404 network error.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: Mutex<HashMap<String, MockResponse>>,
    requests: Mutex<Vec<SourceRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replies to requests for `url` with `body`.
    pub fn respond(self, url: impl Into<String>, body: JsonValue) -> Self {
        self.set_response(url.into(), MockResponse::Body(body));
        self
    }

    /// Fails requests for `url` with the given status.
    pub fn fail(self, url: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        self.set_response(
            url.into(),
            MockResponse::Failure {
                status,
                message: message.into(),
            },
        );
        self
    }

    fn set_response(&self, url: String, response: MockResponse) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url, response);
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<SourceRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, request: SourceRequest) -> DataPointResult<JsonValue> {
        let url = request.url.clone();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let response = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&url)
            .cloned();

        match response {
            Some(MockResponse::Body(body)) => Ok(body),
            Some(MockResponse::Failure { status, message }) => {
                Err(DataPointError::network_status(message, url, status))
            }
            None => Err(DataPointError::network_status(
                format!("No mock response for {}", url),
                url,
                404,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_records_requests() {
        let fetcher = MockFetcher::new().respond("http://remote.test/source1", json!({"ok": true}));

        let body = fetcher
            .fetch(SourceRequest::get("http://remote.test/source1"))
            .await
            .unwrap();

        assert_eq!(body, json!({"ok": true}));
        assert_eq!(fetcher.call_count(), 1);
        assert_eq!(fetcher.requests()[0].url, "http://remote.test/source1");
    }

    #[tokio::test]
    async fn test_mock_failures() {
        let fetcher = MockFetcher::new().fail("http://remote.test/down", 503, "unavailable");

        let err = fetcher
            .fetch(SourceRequest::get("http://remote.test/down"))
            .await
            .unwrap_err();
        assert!(matches!(err, DataPointError::NetworkError { status: Some(503), .. }));

        let err = fetcher
            .fetch(SourceRequest::get("http://remote.test/unknown"))
            .await
            .unwrap_err();
        assert!(matches!(err, DataPointError::NetworkError { status: Some(404), .. }));
        assert_eq!(fetcher.call_count(), 2);
    }
}
