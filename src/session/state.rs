//! Session lifecycle state.

use std::fmt;

use serde::Serialize;

use crate::discovery::Target;

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle of the single active session.
///
/// ```text
/// Disconnected ──connect──► Connecting ──open──► Connected
///      ▲                        │                    │
///      └────────failure─────────┘◄───close/error─────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No transport.
    #[default]
    Disconnected,
    /// Discovery or handshake in progress.
    Connecting,
    /// Transport open and attached to the dispatcher.
    Connected,
}

impl SessionState {
    /// Returns `true` if commands can be sent.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
        }
    }
}

// ============================================================================
// SessionStatus
// ============================================================================

/// Point-in-time snapshot of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Shorthand for `state == Connected`.
    pub connected: bool,
    /// Current value of the reconnect counter.
    pub reconnect_attempts: u32,
    /// Automatic reconnection gave up; only a manual connect helps.
    pub exhausted: bool,
    /// A backoff wait or automatic attempt is in progress.
    pub reconnecting: bool,
    /// Most recently attached target.
    pub target: Option<Target>,
}

// ============================================================================
// Tests
// ============================================================================
