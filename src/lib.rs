//! CDP Bridge - Persistent remote debugging client.
//!
//! This library keeps one WebSocket open to a browser's remote debugging
//! endpoint (Chrome DevTools Protocol), multiplexes concurrently issued
//! commands over it and reconnects on its own when the connection drops.
//!
//! # Architecture
//!
//! ```text
//! control (HTTP) ──► browser::Page ──► Client ──► Dispatcher ──► Connection ⇄ endpoint
//!                                        │             ▲
//!                                        └──► Supervisor (discovery, backoff)
//! ```
//!
//! Key design principles:
//!
//! - One active target and one socket per [`Client`]
//! - Every command carries a correlation id that is never reused
//! - Frames without an id are events and never settle a command
//! - Connection loss fails in-flight commands and schedules a reconnect
//!
//! # Quick Start
//!
//! ```no_run
//! use cdp_bridge::{Client, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Browser started with --remote-debugging-port=9222
//!     let client = Client::builder().port(9222).build()?;
//!
//!     let page = client.page();
//!     page.goto("https://example.com").await?;
//!     println!("Page title: {}", page.title().await?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | Page actions: navigate, click, type, evaluate, capture |
//! | [`client`] | Client facade and configuration |
//! | [`control`] | Action-object API and its HTTP binding |
//! | [`discovery`] | Target listing and selection |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Wire message types |
//! | [`session`] | Command dispatcher and reconnection supervisor |
//! | [`transport`] | WebSocket connection |

// ============================================================================
// Modules
// ============================================================================

/// Page actions expressed as protocol commands.
pub mod browser;

/// Client facade and configuration.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Action-object control surface.
pub mod control;

/// Target discovery over the endpoint's HTTP listing.
pub mod discovery;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Protocol message types.
pub mod protocol;

/// Command correlation and connection lifecycle.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::Page;

// Client types
pub use client::{Client, ClientBuilder};

// Discovery types
pub use discovery::{BrowserVersion, Target, TargetDiscovery};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{CommandId, TargetId};

// Protocol types
pub use protocol::{Event, ParsedEvent};

// Session types
pub use session::{ReconnectPolicy, SessionState, SessionStatus, Timer, TokioTimer};
