//! Typed key/value fields attached to records

use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::time::Duration;

/// A single structured field
///
/// Values are held as JSON so both encoders render them the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub key: Cow<'static, str>,
    pub value: Value,
}

impl Field {
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn str(key: impl Into<Cow<'static, str>>, value: impl Into<String>) -> Self {
        Self::new(key, Value::String(value.into()))
    }

    pub fn bool(key: impl Into<Cow<'static, str>>, value: bool) -> Self {
        Self::new(key, value)
    }

    pub fn int(key: impl Into<Cow<'static, str>>, value: i64) -> Self {
        Self::new(key, value)
    }

    pub fn uint(key: impl Into<Cow<'static, str>>, value: u64) -> Self {
        Self::new(key, value)
    }

    pub fn float(key: impl Into<Cow<'static, str>>, value: f64) -> Self {
        Self::new(key, value)
    }

    /// Durations are encoded as whole nanoseconds
    pub fn duration(key: impl Into<Cow<'static, str>>, value: Duration) -> Self {
        let nanos = u64::try_from(value.as_nanos()).unwrap_or(u64::MAX);
        Self::new(key, nanos)
    }

    /// The error's display text under the `error` key
    pub fn error(err: &dyn std::error::Error) -> Self {
        Self::str("error", err.to_string())
    }

    pub fn display(key: impl Into<Cow<'static, str>>, value: impl std::fmt::Display) -> Self {
        Self::str(key, value.to_string())
    }

    /// Any serializable value; falls back to its serialization error text
    pub fn any<T: Serialize + ?Sized>(key: impl Into<Cow<'static, str>>, value: &T) -> Self {
        let value = serde_json::to_value(value).unwrap_or_else(|e| Value::String(e.to_string()));
        Self::new(key, value)
    }
}
