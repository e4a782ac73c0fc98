//! Page automation.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | Page struct |
//! | `navigation` | Navigation, reload, URL, title, HTML |
//! | `script` | JavaScript evaluation |
//! | `input` | Click and type by selector |
//! | `screenshot` | Viewport capture |
//! | `wait` | Waiting for a selector to match |
//!
//! # Example
//!
//! ```ignore
//! let page = client.page();
//!
//! page.goto("https://example.com").await?;
//! page.type_text("input[name=q]", "rust").await?;
//! page.click("button[type=submit]").await?;
//!
//! let png = page.screenshot_png().await?;
//! ```

// ============================================================================
// Submodules
// ============================================================================

mod core;
mod input;
mod navigation;
mod screenshot;
mod script;
mod wait;

// ============================================================================
// Re-exports
// ============================================================================

pub use core::Page;
pub use wait::DEFAULT_WAIT_TIMEOUT;
