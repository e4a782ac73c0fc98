//! Control surface: action requests in, JSON replies out.
//!
//! [`dispatch`] is transport-agnostic; [`server`] binds it to HTTP.
//!
//! | action | arguments | result fields |
//! |--------|-----------|---------------|
//! | `connect` | `targetId?` | `id`, `title`, `url` |
//! | `close` | | |
//! | `goto` | `url` | `url` |
//! | `reload` | `ignoreCache?` | |
//! | `click` | `selector` | |
//! | `type` | `selector`, `text` | |
//! | `gettext` | `selector` | `text` |
//! | `waitforselector` | `selector`, `timeout?` (ms, default 5000) | |
//! | `evaluate` (`evaluateasync`) | `code` | `result` |
//! | `html` / `title` / `url` | | `html` / `title` / `url` |
//! | `screenshot` | | `screenshot` (base64 PNG) |
//! | `list` | | `tabs` |
//! | `status` | | `connected`, `reconnectAttempts`, `target`, ... |
//! | `version` | | browser version fields |

// ============================================================================
// Submodules
// ============================================================================

/// Action parsing and execution.
pub mod action;

/// HTTP binding.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use action::{Action, dispatch, error_reply, status_fields, success_reply};
pub use server::{router, serve};
