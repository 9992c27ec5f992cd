//! The `json_get` scalar function
//!
//! Registered once per connection, `json_get(serialized, key)` pulls a value
//! out of a JSON-serialized column, emulating the HSTORE `->` get operation:
//! an integer key indexes into an array, a string key reads an object field.
//! Scalars come back as SQL scalars so they compose with further SQL
//! operations; anything structured is re-serialized as JSON text. Missing
//! keys, out-of-range indexes and JSON `null` all yield the literal string
//! `"null"`.

use rusqlite::functions::FunctionFlags;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use serde_json::Value;

use crate::error::{CloudqError, Result};

/// Register `json_get` on the connection as a deterministic scalar function.
pub fn register(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "json_get",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| json_get(ctx.get_raw(0), ctx.get_raw(1)),
    )
    .map_err(|e| CloudqError::storage("create_function", e.to_string()))
}

fn json_get(object: ValueRef<'_>, key: ValueRef<'_>) -> rusqlite::Result<SqlValue> {
    let serialized = match object {
        ValueRef::Null => return Ok(null_text()),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Integer(n) => n.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Blob(_) => {
            return Err(query_error("json_get: blob value is not JSON".to_string()))
        }
    };

    let value: Value = serde_json::from_str(&serialized).map_err(|e| {
        query_error(format!(
            "json_get: malformed JSON value `{}`: {}",
            serialized, e
        ))
    })?;
    if value.is_null() {
        return Ok(null_text());
    }

    let resolved = match key {
        ValueRef::Integer(index) => value
            .as_array()
            .and_then(|array| usize::try_from(index).ok().and_then(|i| array.get(i))),
        ValueRef::Text(bytes) => {
            let field = String::from_utf8_lossy(bytes);
            value.as_object().and_then(|object| object.get(field.as_ref()))
        }
        _ => None,
    };

    Ok(match resolved {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(
            serde_json::to_string(other)
                .map_err(|e| query_error(format!("json_get: {}", e)))?,
        ),
        None => null_text(),
    })
}

fn null_text() -> SqlValue {
    SqlValue::Text("null".to_string())
}

fn query_error(msg: String) -> rusqlite::Error {
    rusqlite::Error::UserFunctionError(Box::new(CloudqError::Query(msg)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> ValueRef<'_> {
        ValueRef::Text(s.as_bytes())
    }

    fn get(object: ValueRef<'_>, key: ValueRef<'_>) -> SqlValue {
        json_get(object, key).unwrap()
    }

    #[test]
    fn test_sql_null_input() {
        assert_eq!(
            get(ValueRef::Null, text("anything")),
            SqlValue::Text("null".to_string())
        );
    }

    #[test]
    fn test_json_null_input() {
        assert_eq!(
            get(text("null"), text("a")),
            SqlValue::Text("null".to_string())
        );
    }

    #[test]
    fn test_object_field_access() {
        assert_eq!(get(text(r#"{"a":1}"#), text("a")), SqlValue::Integer(1));
    }

    #[test]
    fn test_missing_field() {
        assert_eq!(
            get(text(r#"{"a":1}"#), text("b")),
            SqlValue::Text("null".to_string())
        );
    }

    #[test]
    fn test_array_index_access() {
        assert_eq!(
            get(text("[10,20]"), ValueRef::Integer(1)),
            SqlValue::Integer(20)
        );
    }

    #[test]
    fn test_array_index_out_of_range() {
        assert_eq!(
            get(text("[1,2]"), ValueRef::Integer(5)),
            SqlValue::Text("null".to_string())
        );
        assert_eq!(
            get(text("[1,2]"), ValueRef::Integer(-1)),
            SqlValue::Text("null".to_string())
        );
    }

    #[test]
    fn test_nested_object_reserialized() {
        let result = get(text(r#"{"a":{"b":1}}"#), text("a"));
        let SqlValue::Text(json) = result else {
            panic!("expected text");
        };
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, serde_json::json!({"b": 1}));
    }

    #[test]
    fn test_scalar_results_stay_scalars() {
        assert_eq!(
            get(text(r#"{"s":"prod"}"#), text("s")),
            SqlValue::Text("prod".to_string())
        );
        assert_eq!(
            get(text(r#"{"f":1.5}"#), text("f")),
            SqlValue::Real(1.5)
        );
        assert_eq!(
            get(text(r#"{"b":true}"#), text("b")),
            SqlValue::Integer(1)
        );
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = json_get(text("{not json"), text("a")).unwrap_err();
        assert!(err.to_string().contains("malformed JSON"));
    }

    #[test]
    fn test_registered_function_usable_from_sql() {
        let conn = Connection::open_in_memory().unwrap();
        register(&conn).unwrap();
        let value: String = conn
            .query_row(
                "SELECT json_get('{\"env\":\"prod\"}', 'env')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(value, "prod");
    }
}
