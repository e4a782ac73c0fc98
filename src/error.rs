//! Error types for the CDP bridge.
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use cdp_bridge::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     client.page().goto("https://example.com").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Discovery | [`Error::Discovery`], [`Error::NoTarget`], [`Error::TargetNotFound`] |
//! | Connection | [`Error::Connect`], [`Error::NotConnected`], [`Error::ConnectionLost`], [`Error::PermanentDisconnect`] |
//! | Command | [`Error::RequestTimeout`], [`Error::Protocol`] |
//! | Action | [`Error::ElementNotFound`], [`Error::InvalidArgument`] |
//! | Configuration | [`Error::Config`] |
//! | External | [`Error::Io`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::{CommandId, TargetId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// The target listing could not be fetched or parsed.
    #[error("Discovery failed: {message}")]
    Discovery {
        /// Description of the discovery failure.
        message: String,
    },

    /// The listing offered no target.
    #[error("No target found")]
    NoTarget,

    /// A specifically requested target is not in the listing.
    #[error("No target found: {target_id}")]
    TargetNotFound {
        /// The requested target.
        target_id: TargetId,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Opening the WebSocket to the target failed.
    #[error("Connection failed: {message}")]
    Connect {
        /// Description of the connection error.
        message: String,
    },

    /// A command was attempted without a live connection.
    #[error("Not connected")]
    NotConnected,

    /// The connection dropped while the command was in flight.
    #[error("Connection lost")]
    ConnectionLost,

    /// Automatic reconnection gave up.
    ///
    /// Cleared by an explicit `connect()`.
    #[error("Permanently disconnected after {attempts} reconnect attempts")]
    PermanentDisconnect {
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    // ========================================================================
    // Command Errors
    // ========================================================================
    /// No reply arrived within the command deadline.
    #[error("Command {request_id} ({method}) timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The command id that timed out.
        request_id: CommandId,
        /// Protocol method of the command.
        method: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The endpoint answered with an explicit error payload.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Protocol error code, when the endpoint supplied one.
        code: Option<i64>,
        /// Error message.
        message: String,
    },

    // ========================================================================
    // Action Errors
    // ========================================================================
    /// Selector matched nothing.
    #[error("Element not found: {selector}")]
    ElementNotFound {
        /// CSS selector used.
        selector: String,
    },

    /// Missing or malformed argument.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a discovery error.
    #[inline]
    pub fn discovery(message: impl Into<String>) -> Self {
        Self::Discovery {
            message: message.into(),
        }
    }

    /// Creates a no-target error for an empty listing.
    #[inline]
    pub fn no_target() -> Self {
        Self::NoTarget
    }

    /// Creates a no-target error for a specific missing target.
    #[inline]
    pub fn target_not_found(target_id: TargetId) -> Self {
        Self::TargetNotFound { target_id }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Creates a permanent disconnect error.
    #[inline]
    pub fn permanent_disconnect(attempts: u32) -> Self {
        Self::PermanentDisconnect { attempts }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: CommandId, method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            method: method.into(),
            timeout_ms,
        }
    }

    /// Creates a protocol error without a code.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            code: None,
            message: message.into(),
        }
    }

    /// Creates a protocol error carrying the endpoint's error code.
    #[inline]
    pub fn protocol_with_code(code: i64, message: impl Into<String>) -> Self {
        Self::Protocol {
            code: Some(code),
            message: message.into(),
        }
    }

    /// Creates an element not found error.
    #[inline]
    pub fn element_not_found(selector: impl Into<String>) -> Self {
        Self::ElementNotFound {
            selector: selector.into(),
        }
    }

    /// Creates an invalid argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Classification
// ============================================================================

impl Error {
    /// Returns the taxonomy name reported to control-surface callers.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "ConfigError",
            Self::Discovery { .. } => "DiscoveryError",
            Self::NoTarget | Self::TargetNotFound { .. } => "NoTargetError",
            Self::Connect { .. } => "ConnectError",
            Self::NotConnected => "NotConnectedError",
            Self::ConnectionLost => "ConnectionLostError",
            Self::PermanentDisconnect { .. } => "PermanentDisconnectError",
            Self::RequestTimeout { .. } => "TimeoutError",
            Self::Protocol { .. } => "ProtocolError",
            Self::ElementNotFound { .. } => "ElementNotFoundError",
            Self::InvalidArgument { .. } => "InvalidArgumentError",
            Self::Io(_) => "IoError",
            Self::Json(_) => "JsonError",
        }
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RequestTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::NotConnected
                | Self::ConnectionLost
                | Self::PermanentDisconnect { .. }
        )
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RequestTimeout { .. }
                | Self::ConnectionLost
                | Self::NotConnected
                | Self::Connect { .. }
                | Self::Discovery { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connect("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_no_target_display() {
        assert_eq!(Error::no_target().to_string(), "No target found");
        assert_eq!(
            Error::target_not_found(TargetId::from("X")).to_string(),
            "No target found: X"
        );
    }

    #[test]
    fn test_timeout_display() {
        let err = Error::request_timeout(CommandId::new(7), "Page.navigate", 100);
        assert_eq!(
            err.to_string(),
            "Command 7 (Page.navigate) timed out after 100ms"
        );
        assert!(err.is_timeout());
        assert_eq!(err.kind(), "TimeoutError");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Error::discovery("x").kind(), "DiscoveryError");
        assert_eq!(Error::no_target().kind(), "NoTargetError");
        assert_eq!(Error::connect("x").kind(), "ConnectError");
        assert_eq!(Error::NotConnected.kind(), "NotConnectedError");
        assert_eq!(Error::ConnectionLost.kind(), "ConnectionLostError");
        assert_eq!(Error::protocol("x").kind(), "ProtocolError");
        assert_eq!(Error::element_not_found("#a").kind(), "ElementNotFoundError");
        assert_eq!(
            Error::permanent_disconnect(5).kind(),
            "PermanentDisconnectError"
        );
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connect("test").is_connection_error());
        assert!(Error::ConnectionLost.is_connection_error());
        assert!(Error::permanent_disconnect(3).is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::ConnectionLost.is_recoverable());
        assert!(!Error::permanent_disconnect(3).is_recoverable());
        assert!(!Error::element_not_found("#x").is_recoverable());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::AddrInUse, "port taken");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
