//! WebSocket transport layer.
//!
//! This module owns the socket to the remote debugging endpoint. It knows
//! nothing about command ids or protocol semantics.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Dispatcher     │                              │  Browser        │
//! │                 │         WebSocket            │  (DevTools)     │
//! │  → Connection   │─────────────────────────────►│                 │
//! │                 │  ws://host:9222/devtools/... │  Target         │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::open` - WebSocket handshake with the target's debugger URL
//! 2. Register frame, error and close handlers
//! 3. `Connection::send` - Queue text frames
//! 4. Close handler fires once, with a [`CloseReason`]

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{CloseHandler, CloseReason, Connection, ErrorHandler, FrameHandler};
