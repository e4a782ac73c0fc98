//! Core Page struct.

use std::fmt;

use serde_json::Value;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::protocol::Command;

// ============================================================================
// Page
// ============================================================================

/// A handle to the page of the client's current target.
///
/// Pages provide navigation, scripting, input and capture. Every method
/// goes through the client, so it connects on first use and follows the
/// session across reconnects.
#[derive(Clone)]
pub struct Page {
    pub(crate) client: Client,
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("target", &self.client.current_target().map(|t| t.id))
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Creates a page handle.
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns the owning client.
    #[inline]
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }
}

// ============================================================================
// Page - Internal
// ============================================================================

impl Page {
    /// Sends a command and returns its result.
    pub(crate) async fn send_command(&self, command: Command) -> Result<Value> {
        self.client.execute(&command).await
    }
}

/// Rejects an empty selector before any round trip.
pub(crate) fn require_selector(selector: &str) -> Result<()> {
    if selector.trim().is_empty() {
        return Err(Error::invalid_argument("selector must not be empty"));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
