//! Inspectable targets and the selection policy.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashSet;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::TargetId;

// ============================================================================
// Constants
// ============================================================================

/// URL schemes that belong to the browser itself rather than to web content.
const INTERNAL_SCHEMES: &[&str] = &[
    "chrome",
    "chrome-extension",
    "chrome-untrusted",
    "chrome-search",
    "devtools",
    "edge",
    "brave",
    "opera",
    "vivaldi",
    "view-source",
];

// ============================================================================
// Target
// ============================================================================

/// One inspectable surface offered by the remote endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    /// Target id.
    pub id: TargetId,
    /// Page title (may be empty).
    pub title: String,
    /// Page URL (may be empty).
    pub url: String,
    /// Debugger WebSocket URL. Empty when another client is attached.
    #[serde(rename = "webSocketDebuggerUrl")]
    pub socket_address: String,
    /// Target type (`page`, `iframe`, `service_worker`, ...), if reported.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Target {
    /// Builds a target from one listing entry.
    ///
    /// Returns `None` for entries without a string `id`. Every other field
    /// is optional and unknown fields are ignored.
    #[must_use]
    pub fn from_listing_entry(entry: &Value) -> Option<Self> {
        let id = entry.get("id").and_then(Value::as_str).filter(|id| !id.is_empty())?;

        let string_field = |key: &str| {
            entry
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Some(Self {
            id: TargetId::new(id),
            title: string_field("title"),
            url: string_field("url"),
            socket_address: string_field("webSocketDebuggerUrl"),
            kind: entry.get("type").and_then(Value::as_str).map(str::to_string),
        })
    }

    /// Returns `true` if the target can be attached to.
    #[inline]
    #[must_use]
    pub fn is_attachable(&self) -> bool {
        !self.socket_address.is_empty()
    }

    /// Returns `true` for page targets, or targets that do not report a type.
    #[inline]
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.kind.as_deref().is_none_or(|kind| kind == "page")
    }

    /// Returns `true` if the URL uses a browser-internal scheme.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        is_internal_url(&self.url)
    }
}

/// Returns `true` if `url` uses a browser-internal scheme.
#[must_use]
pub fn is_internal_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => INTERNAL_SCHEMES.contains(&parsed.scheme()),
        Err(_) => false,
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Parses the endpoint's target listing.
///
/// Entries without an id are skipped; a repeated id keeps its first entry.
///
/// # Errors
///
/// Returns [`Error::Discovery`] if the listing is not a JSON array.
pub fn parse_listing(listing: &Value) -> Result<Vec<Target>> {
    let entries = listing
        .as_array()
        .ok_or_else(|| Error::discovery("Target listing is not a JSON array"))?;

    let mut seen = FxHashSet::default();
    let mut targets = Vec::with_capacity(entries.len());

    for entry in entries {
        match Target::from_listing_entry(entry) {
            Some(target) => {
                if seen.insert(target.id.clone()) {
                    targets.push(target);
                } else {
                    warn!(id = %target.id, "Duplicate target id in listing");
                }
            }
            None => debug!(?entry, "Skipping listing entry without id"),
        }
    }

    Ok(targets)
}

// ============================================================================
// Selection
// ============================================================================

/// Picks the target to attach to.
///
/// With `preferred` set, that exact target is required. Otherwise the first
/// match wins, in this order:
///
/// 1. attachable page with a non-internal URL
/// 2. attachable page
/// 3. any attachable target
/// 4. any target
///
/// # Errors
///
/// - [`Error::NoTarget`] if `targets` is empty
/// - [`Error::TargetNotFound`] if `preferred` is not in `targets`
pub fn select_target(targets: &[Target], preferred: Option<&TargetId>) -> Result<Target> {
    if let Some(id) = preferred {
        return targets
            .iter()
            .find(|target| &target.id == id)
            .cloned()
            .ok_or_else(|| Error::target_not_found(id.clone()));
    }

    targets
        .iter()
        .find(|t| t.is_attachable() && t.is_page() && !t.is_internal())
        .or_else(|| targets.iter().find(|t| t.is_attachable() && t.is_page()))
        .or_else(|| targets.iter().find(|t| t.is_attachable()))
        .or_else(|| targets.first())
        .cloned()
        .ok_or_else(Error::no_target)
}

// ============================================================================
// Tests
// ============================================================================
