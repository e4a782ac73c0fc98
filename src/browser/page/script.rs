//! JavaScript evaluation methods.

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Command, RuntimeCommand};

use super::Page;

// ============================================================================
// Page - Script Evaluation
// ============================================================================

impl Page {
    /// Evaluates a JavaScript expression in the page and returns its value.
    ///
    /// Promises are awaited. An expression without a serializable result
    /// (e.g. `undefined`) yields `Value::Null`.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let count = page.evaluate("document.links.length").await?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the script throws.
    pub async fn evaluate(&self, code: &str) -> Result<Value> {
        debug!(code_len = code.len(), "Evaluating script");

        let command = Command::Runtime(RuntimeCommand::evaluate(code));
        let result = self.send_command(command).await?;
        evaluation_value(&result)
    }

    /// Evaluates an expression that must produce a string.
    pub(crate) async fn evaluate_string(&self, code: &str, what: &str) -> Result<String> {
        match self.evaluate(code).await? {
            Value::String(text) => Ok(text),
            other => Err(Error::protocol(format!(
                "Expected {what} to be a string, got {other}"
            ))),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extracts the value from a `Runtime.evaluate` result.
pub(crate) fn evaluation_value(result: &Value) -> Result<Value> {
    if let Some(details) = result.get("exceptionDetails") {
        return Err(Error::protocol(exception_message(details)));
    }

    Ok(result
        .pointer("/result/value")
        .cloned()
        .unwrap_or(Value::Null))
}

/// Builds a readable message from `exceptionDetails`.
fn exception_message(details: &Value) -> String {
    details
        .pointer("/exception/description")
        .and_then(Value::as_str)
        .or_else(|| details.get("text").and_then(Value::as_str))
        .map_or_else(
            || "Script threw an exception".to_string(),
            |message| format!("Script threw: {message}"),
        )
}

/// Escapes a string for safe use in JavaScript.
pub(crate) fn json_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

// ============================================================================
// Tests
// ============================================================================
