//! Session layer: command correlation and connection lifecycle.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  ensure_connected  ┌──────────────┐  attach/detach  ┌──────────────┐
//! │  Client      │───────────────────►│  Supervisor  │────────────────►│  Dispatcher  │
//! │              │                    │              │◄────on_lost─────│              │
//! │              │──────call─────────────────────────────────────────►│  → Connection│
//! └──────────────┘                    └──────────────┘                 └──────────────┘
//! ```
//!
//! The [`Dispatcher`] correlates commands and replies over whatever
//! connection is attached. The [`Supervisor`] decides when to attach a new
//! one and is the only component that replaces or closes it.

// ============================================================================
// Submodules
// ============================================================================

/// Command correlation and event fan-out.
pub mod dispatcher;

/// Session lifecycle state.
pub mod state;

/// Connect, auto-connect and reconnect with backoff.
pub mod supervisor;

/// Backoff timer abstraction.
pub mod timer;

// ============================================================================
// Re-exports
// ============================================================================

pub use dispatcher::{Dispatcher, LostHandler, MAX_PENDING_COMMANDS};
pub use state::{SessionState, SessionStatus};
pub use supervisor::{ReconnectPolicy, Supervisor, SupervisorConfig};
pub use timer::{Timer, TokioTimer};
