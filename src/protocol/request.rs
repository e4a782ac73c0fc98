//! Request and Response message types.
//!
//! Outbound commands and their correlated replies, plus classification of
//! inbound frames into replies and events.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, from_str, from_value};

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

use super::{Command, Event};

// ============================================================================
// Request
// ============================================================================

/// A command request sent to the remote endpoint.
///
/// # Format
///
/// ```json
/// {
///   "id": 1,
///   "method": "Domain.methodName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    /// Correlation id echoed by the reply.
    pub id: CommandId,

    /// Protocol method in `Domain.methodName` form.
    pub method: String,

    /// Method parameters (an object, `{}` when there are none).
    pub params: Value,
}

impl Request {
    /// Creates a request from a raw method name and parameters.
    ///
    /// `null` params are normalized to `{}`.
    #[inline]
    #[must_use]
    pub fn new(id: CommandId, method: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Creates a request from a typed command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the command cannot be serialized.
    pub fn from_command(id: CommandId, command: &Command) -> Result<Self> {
        let (method, params) = command.to_parts()?;
        Ok(Self::new(id, method, params))
    }

    /// Serializes the request to a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    #[inline]
    pub fn to_frame(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Response
// ============================================================================

/// A reply from the remote endpoint.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 1, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": 1, "error": { "code": -32601, "message": "..." } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: CommandId,

    /// Result data (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error payload (if error).
    #[serde(default)]
    pub error: Option<ResponseError>,
}

/// Error payload carried by a failed reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResponseError {
    /// Protocol error code.
    #[serde(default)]
    pub code: Option<i64>,

    /// Error message.
    #[serde(default)]
    pub message: String,

    /// Optional extra detail.
    #[serde(default)]
    pub data: Option<Value>,
}

impl Response {
    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, returning error if response was error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the response carried an error payload.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            None => Ok(self.result.unwrap_or(Value::Null)),
            Some(error) => {
                let mut message = if error.message.is_empty() {
                    "unknown error".to_string()
                } else {
                    error.message
                };
                if let Some(Value::String(data)) = error.data {
                    message = format!("{message}: {data}");
                }
                Err(match error.code {
                    Some(code) => Error::protocol_with_code(code, message),
                    None => Error::protocol(message),
                })
            }
        }
    }
}

// ============================================================================
// Incoming
// ============================================================================

/// An inbound frame, classified by the presence of an `id` field.
#[derive(Debug, Clone)]
pub enum Incoming {
    /// Reply to a previously sent command.
    Response(Response),
    /// Asynchronous notification.
    Event(Event),
}

impl Incoming {
    /// Parses a text frame.
    ///
    /// Frames carrying an `id` are replies; frames without one are events.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for invalid JSON and [`Error::Protocol`] for
    /// frames that are neither a reply nor an event.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = from_str(text)?;

        if !value.is_object() {
            return Err(Error::protocol("Inbound frame is not a JSON object"));
        }

        if value.get("id").is_some_and(|id| !id.is_null()) {
            return Ok(Self::Response(from_value(value)?));
        }

        if value.get("method").is_some_and(Value::is_string) {
            return Ok(Self::Event(from_value(value)?));
        }

        Err(Error::protocol("Inbound frame has neither id nor method"))
    }
}

// ============================================================================
// Tests
// ============================================================================
