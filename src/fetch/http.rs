//! `reqwest` backed implementation of the network capability.

use super::{Fetcher, HttpMethod, SourceRequest};
use crate::config::HttpConfig;
use crate::error::{DataPointError, DataPointResult};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Method};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::time::Duration;

/// Fetcher that performs real HTTP requests.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    /// Underlying HTTP client
    client: Client,
    /// Headers added to every request unless the request sets them
    default_headers: BTreeMap<String, String>,
}

impl HttpFetcher {
    /// Creates a fetcher from the HTTP section of the engine configuration.
    pub fn new(config: &HttpConfig) -> DataPointResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| DataPointError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            default_headers: config.default_headers.clone(),
        })
    }

    fn method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: SourceRequest) -> DataPointResult<JsonValue> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self.client.request(Self::method(request.method), &request.url);
        for (name, value) in &self.default_headers {
            if !request.headers.contains_key(name) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(DataPointError::network_status(
                format!("HTTP {} from {}: {}", status.as_u16(), request.url, text),
                request.url,
                status.as_u16(),
            ));
        }

        // Non-JSON bodies are passed through as strings.
        Ok(serde_json::from_str(&text).unwrap_or(JsonValue::String(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_from_default_config() {
        let fetcher = HttpFetcher::new(&HttpConfig::default());
        assert!(fetcher.is_ok());
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(HttpFetcher::method(HttpMethod::Get), Method::GET);
        assert_eq!(HttpFetcher::method(HttpMethod::Patch), Method::PATCH);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let config = HttpConfig {
            timeout_secs: 1,
            ..HttpConfig::default()
        };
        let fetcher = HttpFetcher::new(&config).unwrap();

        let result = fetcher.fetch(SourceRequest::get("http://127.0.0.1:9/unreachable")).await;

        assert!(matches!(result, Err(DataPointError::NetworkError { .. })));
    }
}
