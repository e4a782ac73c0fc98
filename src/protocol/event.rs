//! Event message types.
//!
//! Events are notifications the remote endpoint pushes without a
//! correlation id. They never resolve a pending command.
//!
//! # Event Types
//!
//! | Domain | Events |
//! |--------|--------|
//! | `Runtime` | `consoleAPICalled`, `exceptionThrown` |
//! | `Log` | `entryAdded` |
//! | `Page` | `loadEventFired`, `domContentEventFired`, `frameNavigated` |
//! | `Inspector` | `detached`, `targetCrashed` |

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Event
// ============================================================================

/// An event notification from the remote endpoint.
///
/// # Format
///
/// ```json
/// {
///   "method": "Domain.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Event name in `Domain.eventName` format.
    pub method: String,

    /// Event-specific data.
    #[serde(default)]
    pub params: Value,

    /// Flattened-session id, present when the endpoint multiplexes sessions.
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
}

impl Event {
    /// Returns the domain name from the method.
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name from the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split('.').nth(1).unwrap_or_default()
    }

    /// Parses the event into a typed variant.
    #[must_use]
    pub fn parse(&self) -> ParsedEvent {
        match self.method.as_str() {
            "Runtime.consoleAPICalled" => ParsedEvent::ConsoleApiCalled {
                level: self.get_string_or("type", "log"),
                text: console_text(self.params.get("args")),
            },

            "Runtime.exceptionThrown" => ParsedEvent::ExceptionThrown {
                text: self
                    .params
                    .pointer("/exceptionDetails/exception/description")
                    .or_else(|| self.params.pointer("/exceptionDetails/text"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            },

            "Log.entryAdded" => ParsedEvent::LogEntryAdded {
                level: self.get_pointer_string("/entry/level"),
                text: self.get_pointer_string("/entry/text"),
                url: self
                    .params
                    .pointer("/entry/url")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },

            "Page.loadEventFired" => ParsedEvent::LoadEventFired {
                timestamp: self.params.get("timestamp").and_then(Value::as_f64).unwrap_or_default(),
            },

            "Page.domContentEventFired" => ParsedEvent::DomContentEventFired {
                timestamp: self.params.get("timestamp").and_then(Value::as_f64).unwrap_or_default(),
            },

            "Page.frameNavigated" => ParsedEvent::FrameNavigated {
                frame_id: self.get_pointer_string("/frame/id"),
                url: self.get_pointer_string("/frame/url"),
                is_main_frame: self.params.pointer("/frame/parentId").is_none(),
            },

            "Inspector.detached" => ParsedEvent::Detached {
                reason: self.get_string_or("reason", "unknown"),
            },

            "Inspector.targetCrashed" => ParsedEvent::TargetCrashed,

            _ => ParsedEvent::Unknown {
                method: self.method.clone(),
                params: self.params.clone(),
            },
        }
    }

    /// Gets a string from params with default.
    #[inline]
    fn get_string_or(&self, key: &str, default: &str) -> String {
        self.params
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    /// Gets a string at a JSON pointer, empty if absent.
    #[inline]
    fn get_pointer_string(&self, pointer: &str) -> String {
        self.params
            .pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

/// Joins console call arguments the way a devtools console prints them.
fn console_text(args: Option<&Value>) -> String {
    let Some(Value::Array(args)) = args else {
        return String::new();
    };

    args.iter()
        .map(|arg| match arg.get("value") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => arg
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// ParsedEvent
// ============================================================================

/// Parsed event types for type-safe handling.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// `console.*` call in the page.
    ConsoleApiCalled {
        /// Console method (`log`, `warning`, `error`, ...).
        level: String,
        /// Space-joined arguments.
        text: String,
    },

    /// Uncaught exception in the page.
    ExceptionThrown {
        /// Exception description.
        text: String,
    },

    /// Browser log entry.
    LogEntryAdded {
        /// Severity.
        level: String,
        /// Message.
        text: String,
        /// Originating URL.
        url: Option<String>,
    },

    /// `load` event fired.
    LoadEventFired {
        /// Monotonic timestamp in seconds.
        timestamp: f64,
    },

    /// `DOMContentLoaded` event fired.
    DomContentEventFired {
        /// Monotonic timestamp in seconds.
        timestamp: f64,
    },

    /// A frame committed a navigation.
    FrameNavigated {
        /// Frame id.
        frame_id: String,
        /// New URL.
        url: String,
        /// Whether this is the top-level frame.
        is_main_frame: bool,
    },

    /// The debugging session was detached by the browser.
    Detached {
        /// Detach reason.
        reason: String,
    },

    /// The target's renderer crashed.
    TargetCrashed,

    /// Unknown event type.
    Unknown {
        /// Event method.
        method: String,
        /// Event params.
        params: Value,
    },
}

// ============================================================================
// Tests
// ============================================================================
