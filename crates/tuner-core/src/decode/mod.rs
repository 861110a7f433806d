//! Decoders for semi-structured oracle replies.
//!
//! Each parsing strategy returns a [`Decoded`] value instead of throwing, so
//! strategies can be tested one at a time and composed into fixed fallback
//! chains (strict parse → repair → caller default).
//!
//! - [`json_array`] - JSON array extraction and repair for test case batches
//! - [`protocol`] - The two-section `EVALUATION:` / `OPTIMIZED_PROMPT:` reply
//! - [`decode_object`] - A bare JSON object reply (extracted parameters)
//! - [`is_affirmative`] - Strict yes/no verdicts

pub mod json_array;
pub mod protocol;

use std::fmt;

use serde_json::{Map, Value};

pub use json_array::{decode_test_cases, parse_array, repair_json, slice_array};
pub use protocol::{decode_rewrite, RewriteReply, EVALUATION_MARKER, PROMPT_MARKER};

/// Outcome of a decoding strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    /// The reply parsed as-is.
    Parsed(T),
    /// The reply parsed after a repair pass, or was partially recovered.
    Repaired(T),
    /// No value could be produced.
    Rejected(Rejection),
}

/// Why a strategy produced no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// A required marker or delimiter is absent.
    Missing(String),
    /// The text is not valid JSON.
    Malformed(String),
    /// Valid JSON of the wrong shape (or empty).
    Unexpected(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(what) => write!(f, "missing {}", what),
            Self::Malformed(err) => write!(f, "malformed JSON: {}", err),
            Self::Unexpected(what) => write!(f, "unexpected value: {}", what),
        }
    }
}

impl<T> Decoded<T> {
    /// The decoded value, whichever strategy produced it.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Parsed(value) | Self::Repaired(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    pub fn is_repaired(&self) -> bool {
        matches!(self, Self::Repaired(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        match self {
            Self::Parsed(value) => Decoded::Parsed(f(value)),
            Self::Repaired(value) => Decoded::Repaired(f(value)),
            Self::Rejected(reason) => Decoded::Rejected(reason),
        }
    }
}

/// True iff the reply is exactly "yes" after trimming, ignoring case.
pub fn is_affirmative(reply: &str) -> bool {
    reply.trim().to_lowercase() == "yes"
}

/// Decode a reply that consists of a single JSON object.
pub fn decode_object(reply: &str) -> Decoded<Map<String, Value>> {
    let trimmed = reply.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return Decoded::Rejected(Rejection::Missing("JSON object".into()));
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Decoded::Parsed(map),
        Ok(other) => Decoded::Rejected(Rejection::Unexpected(type_name(&other).into())),
        Err(e) => Decoded::Rejected(Rejection::Malformed(e.to_string())),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
