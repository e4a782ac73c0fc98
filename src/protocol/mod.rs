//! DevTools protocol message types.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Local → Remote | Command request with correlation id |
//! | `Response` | Remote → Local | Reply echoing the id |
//! | `Event` | Remote → Local | Notification without an id |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Typed commands by domain |
//! | `event` | Event and ParsedEvent types |
//! | `request` | Request, Response and inbound frame classification |

// ============================================================================
// Submodules
// ============================================================================

/// Typed command definitions organized by domain.
pub mod command;

/// Event message types.
pub mod event;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{
    Command, InputCommand, MouseButton, MouseEventType, PageCommand, RuntimeCommand,
    ScreenshotFormat,
};
pub use event::{Event, ParsedEvent};
pub use request::{Incoming, Request, Response, ResponseError};
