use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{ReducerFunction, SyncFunction};
use crate::accumulator::Accumulator;
use crate::error::{DataPointError, DataPointResult};
use crate::reducer::type_name;

type Builtin = fn(&Accumulator, &[String]) -> DataPointResult<JsonValue>;

/// Returns the default set of built-in functions.
pub fn builtin_functions() -> HashMap<String, Arc<dyn ReducerFunction>> {
    let builtins: [(&str, Builtin); 10] = [
        ("string.append", string_append),
        ("string.prepend", string_prepend),
        ("string.upperCase", string_upper_case),
        ("string.lowerCase", string_lower_case),
        ("string.trim", string_trim),
        ("collection.length", collection_length),
        ("collection.first", collection_first),
        ("collection.last", collection_last),
        ("json.parse", json_parse),
        ("json.stringify", json_stringify),
    ];

    builtins
        .into_iter()
        .map(|(name, function)| {
            let function: Arc<dyn ReducerFunction> = Arc::new(SyncFunction::new(function));
            (name.to_string(), function)
        })
        .collect()
}

fn expect_args(name: &str, args: &[String], count: usize) -> DataPointResult<()> {
    if args.len() != count {
        return Err(DataPointError::execution(
            name,
            format!("{}() requires exactly {} argument(s), got {}", name, count, args.len()),
        ));
    }
    Ok(())
}

fn expect_string<'a>(name: &str, acc: &'a Accumulator) -> DataPointResult<&'a str> {
    acc.value.as_str().ok_or_else(|| {
        DataPointError::execution(
            name,
            format!("{}() requires a string value, found {}", name, type_name(&acc.value)),
        )
    })
}

fn expect_array<'a>(name: &str, acc: &'a Accumulator) -> DataPointResult<&'a Vec<JsonValue>> {
    acc.value.as_array().ok_or_else(|| {
        DataPointError::execution(
            name,
            format!("{}() requires an array value, found {}", name, type_name(&acc.value)),
        )
    })
}

// String functions

fn string_append(acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
    expect_args("string.append", args, 1)?;
    let value = expect_string("string.append", acc)?;
    Ok(JsonValue::String(format!("{}{}", value, args[0])))
}

fn string_prepend(acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
    expect_args("string.prepend", args, 1)?;
    let value = expect_string("string.prepend", acc)?;
    Ok(JsonValue::String(format!("{}{}", args[0], value)))
}

fn string_upper_case(acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
    expect_args("string.upperCase", args, 0)?;
    Ok(JsonValue::String(expect_string("string.upperCase", acc)?.to_uppercase()))
}

fn string_lower_case(acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
    expect_args("string.lowerCase", args, 0)?;
    Ok(JsonValue::String(expect_string("string.lowerCase", acc)?.to_lowercase()))
}

fn string_trim(acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
    expect_args("string.trim", args, 0)?;
    Ok(JsonValue::String(expect_string("string.trim", acc)?.trim().to_string()))
}

// Collection functions

fn collection_length(acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
    expect_args("collection.length", args, 0)?;
    match &acc.value {
        JsonValue::Array(items) => Ok(JsonValue::from(items.len())),
        JsonValue::Object(map) => Ok(JsonValue::from(map.len())),
        JsonValue::String(s) => Ok(JsonValue::from(s.chars().count())),
        other => Err(DataPointError::execution(
            "collection.length",
            format!("collection.length() cannot measure {}", type_name(other)),
        )),
    }
}

fn collection_first(acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
    expect_args("collection.first", args, 0)?;
    let items = expect_array("collection.first", acc)?;
    Ok(items.first().cloned().unwrap_or(JsonValue::Null))
}

fn collection_last(acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
    expect_args("collection.last", args, 0)?;
    let items = expect_array("collection.last", acc)?;
    Ok(items.last().cloned().unwrap_or(JsonValue::Null))
}

// JSON functions

fn json_parse(acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
    expect_args("json.parse", args, 0)?;
    let text = expect_string("json.parse", acc)?;
    serde_json::from_str(text)
        .map_err(|e| DataPointError::execution("json.parse", format!("invalid JSON: {}", e)))
}

fn json_stringify(acc: &Accumulator, args: &[String]) -> DataPointResult<JsonValue> {
    expect_args("json.stringify", args, 0)?;
    Ok(JsonValue::String(acc.value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn call(name: &str, value: JsonValue, args: &[&str]) -> DataPointResult<JsonValue> {
        let functions = builtin_functions();
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        functions[name].call(&Accumulator::new(value), &args).await
    }

    #[tokio::test]
    async fn test_string_functions() {
        assert_eq!(call("string.append", json!("hello "), &["world"]).await.unwrap(), json!("hello world"));
        assert_eq!(call("string.prepend", json!("world"), &["hello "]).await.unwrap(), json!("hello world"));
        assert_eq!(call("string.upperCase", json!("abc"), &[]).await.unwrap(), json!("ABC"));
        assert_eq!(call("string.lowerCase", json!("ABC"), &[]).await.unwrap(), json!("abc"));
        assert_eq!(call("string.trim", json!("  x "), &[]).await.unwrap(), json!("x"));
    }

    #[tokio::test]
    async fn test_collection_functions() {
        assert_eq!(call("collection.length", json!([1, 2, 3]), &[]).await.unwrap(), json!(3));
        assert_eq!(call("collection.length", json!({"a": 1}), &[]).await.unwrap(), json!(1));
        assert_eq!(call("collection.first", json!([1, 2, 3]), &[]).await.unwrap(), json!(1));
        assert_eq!(call("collection.last", json!([1, 2, 3]), &[]).await.unwrap(), json!(3));
        assert_eq!(call("collection.first", json!([]), &[]).await.unwrap(), JsonValue::Null);
    }

    #[tokio::test]
    async fn test_json_functions() {
        assert_eq!(call("json.parse", json!("{\"a\":1}"), &[]).await.unwrap(), json!({"a": 1}));
        assert_eq!(call("json.stringify", json!({"a": 1}), &[]).await.unwrap(), json!("{\"a\":1}"));
        assert!(call("json.parse", json!("{oops"), &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_type_and_arity_errors() {
        let err = call("string.upperCase", json!(5), &[]).await.unwrap_err();
        assert!(matches!(err, DataPointError::ExecutionError { ref reducer, .. } if reducer == "string.upperCase"));

        assert!(call("string.append", json!("a"), &[]).await.is_err());
        assert!(call("collection.first", json!("abc"), &[]).await.is_err());
        assert!(call("collection.length", json!(true), &[]).await.is_err());
    }
}
