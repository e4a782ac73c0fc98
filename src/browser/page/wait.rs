//! Waiting for elements to appear.

use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::error::{Error, Result};

use super::Page;
use super::core::require_selector;
use super::script::json_string;

// ============================================================================
// Constants
// ============================================================================

/// Default deadline for [`Page::wait_for_selector`].
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Pause between two presence checks.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Page - Wait
// ============================================================================

impl Page {
    /// Waits for an element matching `selector` with the default timeout.
    ///
    /// # Errors
    ///
    /// See [`Page::wait_for_selector_timeout`].
    pub async fn wait_for_selector(&self, selector: &str) -> Result<()> {
        self.wait_for_selector_timeout(selector, DEFAULT_WAIT_TIMEOUT)
            .await
    }

    /// Waits until `selector` matches an element or `timeout` elapses.
    ///
    /// Presence is checked immediately and then every 100ms.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `selector` is empty
    /// - [`Error::ElementNotFound`] if nothing matched before the deadline
    /// - any error of the underlying evaluation
    pub async fn wait_for_selector_timeout(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<()> {
        require_selector(selector)?;
        debug!(
            selector,
            timeout_ms = timeout.as_millis() as u64,
            "Waiting for selector"
        );

        let script = format!("document.querySelector({}) !== null", json_string(selector));
        let deadline = Instant::now() + timeout;

        loop {
            if self.evaluate(&script).await? == Value::Bool(true) {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                debug!(selector, "Selector wait timed out");
                return Err(Error::element_not_found(selector));
            }
            sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}
