//! JSON payloads carried by SSE events and polling responses.
//!
//! # Invariants
//!
//! - A malformed document or a non-array top level is an error for the whole
//!   batch; callers treat it as "no messages this event".
//! - Inside a well-formed array every entry is decoded independently. Entries
//!   that do not decode as a [`Message`] are counted in
//!   [`MessageBatch::skipped`] and dropped (partial success).

use std::time::Duration;

use serde_json::Value;

use crate::{Message, ProtoError, Result};

/// Messages decoded from one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBatch {
    /// Entries that decoded, in payload order.
    pub messages: Vec<Message>,
    /// Entries that were dropped because they did not decode.
    pub skipped: usize,
}

/// Decode a JSON array of messages.
///
/// # Errors
///
/// - `ProtoError::MalformedPayload` if `data` is not valid JSON
/// - `ProtoError::UnexpectedShape` if the top level is not an array
pub fn parse_message_batch(data: &str) -> Result<MessageBatch> {
    let value: Value = serde_json::from_str(data)?;

    let Value::Array(entries) = value else {
        return Err(ProtoError::UnexpectedShape { expected: "array", found: json_type(&value) });
    };

    let mut batch = MessageBatch::default();
    for entry in entries {
        match serde_json::from_value::<Message>(entry) {
            Ok(message) => batch.messages.push(message),
            Err(_) => batch.skipped += 1,
        }
    }
    Ok(batch)
}

/// Heartbeat timeout advertised in an SSE `heartbeat` event.
///
/// Accepts `{"heartbeat": <secs>}` or a bare number of seconds. Returns `None`
/// for anything else, including zero, negative values and values too large
/// for a [`Duration`].
pub fn parse_heartbeat_timeout(data: &str) -> Option<Duration> {
    let value: Value = serde_json::from_str(data).ok()?;
    let secs = match &value {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => map.get("heartbeat").and_then(Value::as_f64),
        _ => None,
    }?;

    if secs > 0.0 { Duration::try_from_secs_f64(secs).ok() } else { None }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
