//! Type-safe identifiers.
//!
//! Newtype wrappers keep command correlation ids and target ids from being
//! mixed up with plain integers and strings.
//!
//! | Type | Wraps | Source |
//! |------|-------|--------|
//! | [`CommandId`] | `u64` | Generated locally, echoed by the endpoint |
//! | [`TargetId`] | `String` | Assigned by the remote endpoint |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// CommandId
// ============================================================================

/// Correlation id attached to an outbound command and echoed in its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CommandId {
    #[inline]
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ============================================================================
// CommandIdGenerator
// ============================================================================

/// Monotonic id source.
///
/// Ids start at 1 and are never handed out twice, even after the command
/// they belonged to has completed.
#[derive(Debug)]
pub struct CommandIdGenerator {
    next: AtomicU64,
}

impl CommandIdGenerator {
    /// Creates a generator whose first id is 1.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the next id.
    #[inline]
    pub fn generate(&self) -> CommandId {
        CommandId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the id the next call to [`generate`](Self::generate) yields.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> CommandId {
        CommandId(self.next.load(Ordering::Relaxed))
    }
}

impl Default for CommandIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TargetId
// ============================================================================

/// Identifier of an inspectable target as reported by the endpoint listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetId(String);

impl TargetId {
    /// Wraps a raw target id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    #[inline]
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TargetId {
    #[inline]
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Tests
// ============================================================================
