//! Exception and throwable value kinds (spec §3, §4.9).

use super::value::Value;
use std::sync::Arc;

/// An immutable exception record: `(message, label, code, stacktrace)` plus
/// the reference count it inherits from being `Arc`-wrapped inside
/// [`Value::Exception`](super::value::Value).
#[derive(Debug, Clone)]
pub struct Exception {
    message: Arc<str>,
    label: Arc<str>,
    code: i64,
    stacktrace: Arc<str>,
}

impl Exception {
    /// Creates an exception record.
    pub fn new(
        message: impl Into<Arc<str>>,
        label: impl Into<Arc<str>>,
        code: i64,
        stacktrace: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            message: message.into(),
            label: label.into(),
            code,
            stacktrace: stacktrace.into(),
        }
    }

    /// Human-readable failure message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Foreign exception class / type name (e.g. `"TypeError"`).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Back-end specific numeric code, `0` when not provided.
    pub fn code(&self) -> i64 {
        self.code
    }

    /// Foreign stack trace, empty when not available.
    pub fn stacktrace(&self) -> &str {
        &self.stacktrace
    }
}

/// A value marker flagging that its payload is being raised as an exception
/// (spec §3 "Throwable"). Wrapping a throwable in a throwable flattens so the
/// payload never nests past one level (spec §4.9, tested in §8).
#[derive(Debug, Clone)]
pub struct Throwable {
    payload: Box<Value>,
}

impl Throwable {
    /// Wraps `value` as a throwable, flattening if `value` is itself a
    /// throwable (spec §4.9 "creating a throwable from an existing throwable
    /// flattens").
    pub fn wrap(value: Value) -> Self {
        match value {
            Value::Throwable(inner) => Throwable {
                payload: inner.payload.clone(),
            },
            other => Throwable {
                payload: Box::new(other),
            },
        }
    }

    /// The wrapped payload (the value being raised).
    pub fn value(&self) -> &Value {
        &self.payload
    }

    /// Consumes the throwable, returning its payload.
    pub fn into_value(self) -> Value {
        *self.payload
    }
}

/// A convenience struct returned by `error_from_value`, unifying both
/// in-band channels (a throwable value and a bare exception value) into one
/// embedder-facing shape (spec §7 "User-visible behaviour").
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Failure message.
    pub message: String,
    /// Foreign label / class name, empty when not an [`Exception`].
    pub label: String,
    /// Back-end code, `0` when not provided.
    pub code: i64,
    /// Foreign stack trace, empty when not available.
    pub stacktrace: String,
}

impl From<&Exception> for ErrorInfo {
    fn from(exc: &Exception) -> Self {
        ErrorInfo {
            message: exc.message().to_string(),
            label: exc.label().to_string(),
            code: exc.code(),
            stacktrace: exc.stacktrace().to_string(),
        }
    }
}

/// Converts either in-band channel — a `throwable` value or a bare
/// `exception` value — into an [`ErrorInfo`]. Any other value yields `None`.
pub fn error_from_value(value: &Value) -> Option<ErrorInfo> {
    match value {
        Value::Exception(exc) => Some(ErrorInfo::from(exc.as_ref())),
        Value::Throwable(thr) => match thr.value() {
            Value::Exception(exc) => Some(ErrorInfo::from(exc.as_ref())),
            other => Some(ErrorInfo {
                message: other.stringify().unwrap_or_default(),
                label: String::new(),
                code: 0,
                stacktrace: String::new(),
            }),
        },
        _ => None,
    }
}
