//! Typed command definitions organized by protocol domain.
//!
//! Commands follow the `Domain.methodName` format. Only the subset the
//! action library needs is modelled; anything else goes through the raw
//! `call(method, params)` path.
//!
//! # Command Domains
//!
//! | Domain | Commands |
//! |--------|----------|
//! | `Page` | Navigation, frame tree, screenshots |
//! | `Runtime` | Script evaluation |
//! | `Input` | Synthetic mouse events |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Command Wrapper
// ============================================================================

/// All typed protocol commands organized by domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    /// Page domain commands.
    Page(PageCommand),
    /// Runtime domain commands.
    Runtime(RuntimeCommand),
    /// Input domain commands.
    Input(InputCommand),
}

impl Command {
    /// Splits the command into its method name and params object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails and
    /// [`Error::Protocol`] if the serialized form has no method.
    pub fn to_parts(&self) -> Result<(String, Value)> {
        let mut value = serde_json::to_value(self)?;

        let method = value
            .get("method")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::protocol("Command serialized without a method"))?;

        let params = value
            .as_object_mut()
            .and_then(|obj| obj.remove("params"))
            .unwrap_or_else(|| Value::Object(Default::default()));

        Ok((method, params))
    }
}

// ============================================================================
// Page Commands
// ============================================================================

/// Page domain commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum PageCommand {
    /// Navigate the page to a URL.
    #[serde(rename = "Page.navigate")]
    Navigate {
        /// URL to navigate to.
        url: String,
    },

    /// Reload the page.
    #[serde(rename = "Page.reload")]
    Reload {
        /// Bypass the cache.
        #[serde(rename = "ignoreCache")]
        ignore_cache: bool,
    },

    /// Get the frame tree (main frame URL lives here).
    #[serde(rename = "Page.getFrameTree")]
    GetFrameTree,

    /// Capture a screenshot of the viewport.
    #[serde(rename = "Page.captureScreenshot")]
    CaptureScreenshot {
        /// Image format.
        format: ScreenshotFormat,
        /// Compression quality (jpeg only).
        #[serde(skip_serializing_if = "Option::is_none")]
        quality: Option<u8>,
    },
}

/// Image format accepted by `Page.captureScreenshot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotFormat {
    /// PNG (lossless).
    #[default]
    Png,
    /// JPEG.
    Jpeg,
    /// WebP.
    Webp,
}

// ============================================================================
// Runtime Commands
// ============================================================================

/// Runtime domain commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RuntimeCommand {
    /// Evaluate an expression in the page's main world.
    #[serde(rename = "Runtime.evaluate")]
    Evaluate {
        /// JavaScript expression.
        expression: String,
        /// Return the result by value instead of as a remote object.
        #[serde(rename = "returnByValue")]
        return_by_value: bool,
        /// Await the result if it is a Promise.
        #[serde(rename = "awaitPromise")]
        await_promise: bool,
    },
}

impl RuntimeCommand {
    /// Evaluates `expression`, returning the value and awaiting promises.
    #[inline]
    #[must_use]
    pub fn evaluate(expression: impl Into<String>) -> Self {
        Self::Evaluate {
            expression: expression.into(),
            return_by_value: true,
            await_promise: true,
        }
    }
}

// ============================================================================
// Input Commands
// ============================================================================

/// Input domain commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum InputCommand {
    /// Dispatch a synthetic mouse event.
    #[serde(rename = "Input.dispatchMouseEvent")]
    DispatchMouseEvent {
        /// Event type.
        #[serde(rename = "type")]
        event_type: MouseEventType,
        /// X coordinate in CSS pixels.
        x: f64,
        /// Y coordinate in CSS pixels.
        y: f64,
        /// Mouse button.
        button: MouseButton,
        /// Click count.
        #[serde(rename = "clickCount")]
        click_count: u32,
    },
}

/// Mouse event type for `Input.dispatchMouseEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseEventType {
    /// Button pressed.
    MousePressed,
    /// Button released.
    MouseReleased,
    /// Pointer moved.
    MouseMoved,
}

/// Mouse button for `Input.dispatchMouseEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// No button.
    None,
    /// Primary button.
    #[default]
    Left,
    /// Middle button.
    Middle,
    /// Secondary button.
    Right,
}

// ============================================================================
// Tests
// ============================================================================
