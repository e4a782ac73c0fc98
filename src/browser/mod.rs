//! Browser actions module.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Page`] | Navigation, scripting, input and capture on the current target |
//!
//! # Example
//!
//! ```no_run
//! use cdp_bridge::{Client, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = Client::builder().build()?;
//! let page = client.page();
//!
//! page.goto("https://example.com").await?;
//! let title = page.title().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Page automation.
pub mod page;

// ============================================================================
// Re-exports
// ============================================================================

pub use page::{DEFAULT_WAIT_TIMEOUT, Page};
