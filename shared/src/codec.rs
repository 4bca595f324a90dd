//! JSON codec for platform messages
//!
//! Events are published as a bare JSON object on
//! `iot-2/evt/<event>/fmt/json`. Commands arrive on
//! ```text
//! iot-2/cmd/<command>/fmt/<format>
//! ```
//! and only the `json` format is decoded.

use bytes::Bytes;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{platform, Command, MetricSnapshot};

/// Maximum accepted command payload (64 KB)
pub const MAX_COMMAND_SIZE: usize = 64 * 1024;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Not a command topic: {0}")]
    InvalidTopic(String),

    #[error("Unsupported payload format: {0}")]
    UnsupportedFormat(String),

    #[error("Command payload too large: {0} bytes (max: {MAX_COMMAND_SIZE})")]
    PayloadTooLarge(usize),

    #[error("Command payload is not a JSON object")]
    NotAnObject,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encode a snapshot as an event payload
pub fn encode_snapshot(snapshot: &MetricSnapshot) -> Result<Bytes, CodecError> {
    let buf = serde_json::to_vec(snapshot)?;
    Ok(Bytes::from(buf))
}

/// Split a command topic into its command name and payload format
pub fn parse_command_topic(topic: &str) -> Result<(&str, &str), CodecError> {
    let parts: Vec<&str> = topic.split('/').collect();
    match parts.as_slice() {
        ["iot-2", "cmd", name, "fmt", format] if !name.is_empty() => Ok((*name, *format)),
        _ => Err(CodecError::InvalidTopic(topic.to_string())),
    }
}

/// Decode an inbound command from its topic and payload
pub fn decode_command(topic: &str, payload: &[u8]) -> Result<Command, CodecError> {
    let (name, format) = parse_command_topic(topic)?;

    if format != platform::FORMAT_JSON {
        return Err(CodecError::UnsupportedFormat(format.to_string()));
    }

    if payload.len() > MAX_COMMAND_SIZE {
        return Err(CodecError::PayloadTooLarge(payload.len()));
    }

    // Commands without parameters may be sent with no body at all
    if payload.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Command::new(name, Map::new()));
    }

    match serde_json::from_slice::<Value>(payload)? {
        Value::Object(data) => Ok(Command::new(name, data)),
        _ => Err(CodecError::NotAnObject),
    }
}
