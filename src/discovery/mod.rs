//! Target discovery over the endpoint's HTTP listing interface.
//!
//! A browser started with `--remote-debugging-port=9222` serves:
//!
//! | Path | Content |
//! |------|---------|
//! | `/json/list` (alias `/json`) | Array of inspectable targets |
//! | `/json/version` | Browser and protocol version |
//!
//! Discovery is read-only and bounded by the configured timeout.

// ============================================================================
// Submodules
// ============================================================================

/// Target type, listing parser and selection policy.
pub mod target;

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::TargetId;

// ============================================================================
// Re-exports
// ============================================================================

pub use target::{Target, is_internal_url, parse_listing, select_target};

// ============================================================================
// BrowserVersion
// ============================================================================

/// Response of `/json/version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserVersion {
    /// Browser product and version, e.g. `Chrome/126.0.6478.126`.
    #[serde(rename = "Browser", default)]
    pub browser: String,
    /// Protocol version, e.g. `1.3`.
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: String,
    /// User agent string.
    #[serde(rename = "User-Agent", default)]
    pub user_agent: String,
    /// Browser-level debugger URL.
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub socket_address: String,
}

// ============================================================================
// TargetDiscovery
// ============================================================================

/// HTTP client for the endpoint's target listing.
#[derive(Debug, Clone)]
pub struct TargetDiscovery {
    /// HTTP client with the discovery timeout applied.
    http: reqwest::Client,
    /// Endpoint base URL, e.g. `http://127.0.0.1:9222/`.
    base: Url,
    /// Upper bound for one discovery request.
    timeout: Duration,
}

impl TargetDiscovery {
    /// Creates a discovery client for `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the base URL is not `http`/`https` or
    /// the HTTP client cannot be built.
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Discovery endpoint must be http or https, got {base}"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base,
            timeout,
        })
    }

    /// Returns the endpoint base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Fetches all inspectable targets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] if the endpoint is unreachable, times
    /// out, answers with a non-success status or with malformed data.
    pub async fn list_targets(&self) -> Result<Vec<Target>> {
        let listing = match self.fetch_json("json/list").await? {
            Some(listing) => listing,
            // Older endpoints only serve the bare `/json` alias.
            None => self
                .fetch_json("json")
                .await?
                .ok_or_else(|| Error::discovery("Target listing not found (HTTP 404)"))?,
        };

        let targets = parse_listing(&listing)?;
        debug!(count = targets.len(), "Listed targets");
        Ok(targets)
    }

    /// Lists targets and picks one with [`select_target`].
    ///
    /// # Errors
    ///
    /// - [`Error::Discovery`] if listing fails
    /// - [`Error::NoTarget`] / [`Error::TargetNotFound`] if nothing matches
    pub async fn discover(&self, preferred: Option<&TargetId>) -> Result<Target> {
        let targets = self.list_targets().await?;
        let target = select_target(&targets, preferred)?;
        info!(id = %target.id, title = %target.title, url = %target.url, "Selected target");
        Ok(target)
    }

    /// Fetches the browser version information.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] on any failure.
    pub async fn version(&self) -> Result<BrowserVersion> {
        let value = self
            .fetch_json("json/version")
            .await?
            .ok_or_else(|| Error::discovery("Version endpoint not found (HTTP 404)"))?;

        serde_json::from_value(value)
            .map_err(|e| Error::discovery(format!("Malformed version response: {e}")))
    }

    /// GETs `path` relative to the base URL.
    ///
    /// Returns `Ok(None)` on 404 so callers can try an alternative path.
    async fn fetch_json(&self, path: &str) -> Result<Option<Value>> {
        let url = self
            .base
            .join(path)
            .map_err(|e| Error::discovery(format!("Invalid discovery path {path}: {e}")))?;

        debug!(url = %url, "Fetching");

        let response = self.http.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::discovery(format!(
                    "{url} timed out after {}ms",
                    self.timeout.as_millis()
                ))
            } else {
                Error::discovery(format!("{url} unreachable: {e}"))
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::discovery(format!("{url} answered HTTP {status}")));
        }

        let value = response
            .json::<Value>()
            .await
            .map_err(|e| Error::discovery(format!("Malformed JSON from {url}: {e}")))?;

        Ok(Some(value))
    }
}

// ============================================================================
// Tests
// ============================================================================
