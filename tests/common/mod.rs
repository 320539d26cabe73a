//! Shared fixtures for the integration tests.
//!
//! The fixture store mirrors a small but complete setup: four test
//! functions, two hash entities and two source entities served by a
//! [`MockFetcher`].

#![allow(dead_code)]

use datapoint::{Accumulator, DataPoint, DataPointError, DataPointResult, MockFetcher};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

/// Engine plus the mock fetcher it talks to.
pub struct Fixture {
    pub datapoint: DataPoint,
    pub fetcher: Arc<MockFetcher>,
}

impl Fixture {
    /// Builds the fixture store over `fetcher`.
    pub fn new(fetcher: MockFetcher) -> Self {
        let fetcher = Arc::new(fetcher);
        let datapoint = DataPoint::with_fetcher(fetcher.clone());

        datapoint
            .update(|store| {
                let functions = store.functions_mut();
                functions.register_fn("test.addCollectionValues", add_collection_values)?;
                functions.register_fn("test.addString", add_string)?;
                functions.register_fn("test.passThrough", pass_through)?;
                functions.register_fn("test.addKeyValue", add_key_value)?;
                Ok(())
            })
            .expect("fixture functions register");

        datapoint
            .add_entities([
                ("hash:asIs", json!({})),
                ("hash:a.1", json!({"value": "$a.h"})),
                ("source:a1", json!({"url": "http://remote.test/source1"})),
                ("source:a3", json!({"url": "http://remote.test{value.itemPath}"})),
            ])
            .expect("fixture entities register");

        Self { datapoint, fetcher }
    }

    /// Accumulator over `value` bound to the current store.
    pub fn accumulator(&self, value: JsonValue) -> Accumulator {
        self.datapoint.store().accumulator(value)
    }
}

/// Shared input document.
pub fn test_data() -> JsonValue {
    json!({
        "a": {
            "b": {"c": [1, 2, 3]},
            "g": {"g1": 1},
            "h": {"h1": {"h11": "value"}, "h2": [1, 2]}
        },
        "foo": "bar"
    })
}

fn add_collection_values(acc: &Accumulator, _args: &[String]) -> DataPointResult<JsonValue> {
    let items = acc
        .value
        .as_array()
        .ok_or_else(|| DataPointError::execution("test.addCollectionValues", "expected an array"))?;
    Ok(json!(items.iter().filter_map(JsonValue::as_i64).sum::<i64>()))
}

fn add_string(acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
    let base = acc.value.as_str().unwrap_or_default();
    Ok(json!(format!("{}{}", base, args.join(""))))
}

fn pass_through(acc: &Accumulator, _args: &[String]) -> DataPointResult<JsonValue> {
    Ok(acc.value.clone())
}

fn add_key_value(acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
    let (key, raw) = match args {
        [key, raw] => (key, raw),
        _ => return Err(DataPointError::execution("test.addKeyValue", "expected (key, value)")),
    };
    let mut value = acc.value.clone();
    let map = value
        .as_object_mut()
        .ok_or_else(|| DataPointError::execution("test.addKeyValue", "expected an object"))?;
    let parsed = serde_json::from_str(raw).unwrap_or_else(|_| JsonValue::String(raw.clone()));
    map.insert(key.clone(), parsed);
    Ok(value)
}
