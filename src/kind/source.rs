//! The `source` kind: fetch a remote resource and continue with its body.

use super::EntityKind;
use crate::accumulator::Accumulator;
use crate::entity::{EntityDescriptor, RequestControl};
use crate::error::DataPointResult;
use crate::fetch::{Fetcher, HttpMethod, SourceRequest};
use crate::reducer::{BoxedReducer, Reducer};
use crate::store::Store;
use crate::template;
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Options of a `source:*` entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceOptions {
    /// URL template, e.g. `https://api.github.com/orgs/{value}`
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    /// Header templates
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// JSON body, sent as is
    #[serde(default)]
    pub body: Option<JsonValue>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SourceKind;

impl EntityKind for SourceKind {
    fn bind(&self, store: &Arc<Store>, entity: Arc<EntityDescriptor>) -> DataPointResult<BoxedReducer> {
        let options: SourceOptions = entity.options_as()?;
        Ok(Box::new(SourceReducer {
            name: entity.key().to_string(),
            entity,
            options,
            fetcher: Arc::clone(store.fetcher()),
        }))
    }
}

/// Performs exactly one fetch per execution unless a hook responds first.
pub struct SourceReducer {
    name: String,
    entity: Arc<EntityDescriptor>,
    options: SourceOptions,
    fetcher: Arc<dyn Fetcher>,
}

impl SourceReducer {
    fn build_request(&self, acc: &Accumulator) -> DataPointResult<SourceRequest> {
        let mut request =
            SourceRequest::get(template::render(&self.options.url, acc, &self.name)?).with_method(self.options.method);

        for (name, value) in &self.options.headers {
            request = request.with_header(name.as_str(), template::render(value, acc, &self.name)?);
        }
        if let Some(body) = &self.options.body {
            request = request.with_body(body.clone());
        }

        Ok(request)
    }
}

#[async_trait]
impl Reducer for SourceReducer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn reduce(&self, acc: Accumulator) -> DataPointResult<Accumulator> {
        // Hooks see the entity being resolved
        let scoped = acc.clone().with_context(Some(Arc::clone(&self.entity)));
        let request = self.build_request(&scoped)?;
        let hooks = self.entity.hooks();

        let control = match &hooks.before_request {
            Some(hook) => hook.before_request(&scoped, request).await?,
            None => RequestControl::Proceed(request),
        };

        let body = match control {
            RequestControl::Proceed(request) => self.fetcher.fetch(request).await?,
            RequestControl::Respond(body) => {
                debug!("{}: request answered by before_request hook", self.name);
                body
            }
        };

        let body = match &hooks.after_request {
            Some(hook) => hook.after_request(&scoped, body).await?,
            None => body,
        };

        Ok(acc.with_value(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DataPointError;
    use crate::fetch::MockFetcher;
    use serde_json::json;

    fn store_with(fetcher: Arc<MockFetcher>) -> Arc<Store> {
        Arc::new(Store::new(fetcher))
    }

    #[tokio::test]
    async fn test_fetch_with_templated_url() {
        let fetcher = Arc::new(MockFetcher::new().respond("https://api.github.com/orgs/nodejs", json!({"id": 1})));
        let store = store_with(Arc::clone(&fetcher));
        let entity = Arc::new(
            EntityDescriptor::new(
                "source:getOrgInfo",
                json!({"url": "https://api.github.com/orgs/{value}", "headers": {"X-Org": "{value}"}}),
            )
            .unwrap(),
        );

        let reducer = SourceKind.bind(&store, entity).unwrap();
        let acc = reducer.reduce(Accumulator::new(json!("nodejs"))).await.unwrap();

        assert_eq!(acc.value, json!({"id": 1}));
        assert_eq!(acc.initial_value, json!("nodejs"));
        assert!(acc.context.is_none());

        let requests = fetcher.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].headers.get("X-Org").map(String::as_str), Some("nodejs"));
    }

    #[tokio::test]
    async fn test_before_request_rewrites_and_responds() {
        let fetcher = Arc::new(MockFetcher::new().respond("http://remote.test/a", json!("fetched")));
        let store = store_with(Arc::clone(&fetcher));

        let rewriting = EntityDescriptor::new("source:a", json!({"url": "http://remote.test/a"}))
            .unwrap()
            .with_before_request(
                |acc: &Accumulator, request: SourceRequest| -> DataPointResult<RequestControl> {
                    assert_eq!(acc.context.as_ref().map(|c| c.id()), Some("a"));
                    Ok(RequestControl::Proceed(request.with_header("User-Agent", "DataPoint")))
                },
            );
        let reducer = SourceKind.bind(&store, Arc::new(rewriting)).unwrap();
        reducer.reduce(Accumulator::default()).await.unwrap();
        assert_eq!(
            fetcher.requests()[0].headers.get("User-Agent").map(String::as_str),
            Some("DataPoint")
        );

        let cached = EntityDescriptor::new("source:b", json!({"url": "http://remote.test/a"}))
            .unwrap()
            .with_before_request(|_: &Accumulator, _: SourceRequest| -> DataPointResult<RequestControl> {
                Ok(RequestControl::Respond(json!("cached")))
            });
        let reducer = SourceKind.bind(&store, Arc::new(cached)).unwrap();
        let acc = reducer.reduce(Accumulator::default()).await.unwrap();
        assert_eq!(acc.value, json!("cached"));
        assert_eq!(fetcher.call_count(), 1);
    }

    #[tokio::test]
    async fn test_veto_and_after_request() {
        let fetcher = Arc::new(MockFetcher::new().respond("http://remote.test/a", json!({"items": [1, 2]})));
        let store = store_with(Arc::clone(&fetcher));

        let vetoed = EntityDescriptor::new("source:vetoed", json!({"url": "http://remote.test/a"}))
            .unwrap()
            .with_before_request(|_: &Accumulator, _: SourceRequest| -> DataPointResult<RequestControl> {
                Err(DataPointError::execution("source:vetoed", "not allowed"))
            });
        let reducer = SourceKind.bind(&store, Arc::new(vetoed)).unwrap();
        assert!(reducer.reduce(Accumulator::default()).await.is_err());
        assert_eq!(fetcher.call_count(), 0);

        let unwrapped = EntityDescriptor::new("source:items", json!({"url": "http://remote.test/a"}))
            .unwrap()
            .with_after_request(|_: &Accumulator, body: JsonValue| -> DataPointResult<JsonValue> {
                Ok(body["items"].clone())
            });
        let reducer = SourceKind.bind(&store, Arc::new(unwrapped)).unwrap();
        let acc = reducer.reduce(Accumulator::default()).await.unwrap();
        assert_eq!(acc.value, json!([1, 2]));
    }

    #[tokio::test]
    async fn test_bind_requires_url() {
        let store = store_with(Arc::new(MockFetcher::new()));
        let entity = Arc::new(EntityDescriptor::new("source:nourl", json!({})).unwrap());
        assert!(matches!(
            SourceKind.bind(&store, entity).err(),
            Some(DataPointError::ConfigurationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_network_failure_propagates() {
        let fetcher = Arc::new(MockFetcher::new().fail("http://remote.test/down", 503, "unavailable"));
        let store = store_with(fetcher);
        let entity = Arc::new(EntityDescriptor::new("source:down", json!({"url": "http://remote.test/down"})).unwrap());

        let err = SourceKind
            .bind(&store, entity)
            .unwrap()
            .reduce(Accumulator::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DataPointError::NetworkError { status: Some(503), .. }));
    }
}
