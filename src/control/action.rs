//! Control actions: parsing and execution.
//!
//! A request is a JSON object with an `action` name (case-insensitive) and
//! the action's arguments:
//!
//! ```json
//! { "action": "type", "selector": "input[name=q]", "text": "rust" }
//! ```
//!
//! Every request yields a JSON object. Success carries `"success": true`
//! plus the action's result fields; failure carries `"success": false`, the
//! error message and its taxonomy name in `kind`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::browser::DEFAULT_WAIT_TIMEOUT;
use crate::client::Client;
use crate::error::{Error, Result};

// ============================================================================
// Action
// ============================================================================

/// One control-surface request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    /// Connect to a target (or the default one).
    Connect {
        /// Target to attach to.
        #[serde(rename = "targetId", alias = "target_id", default)]
        target_id: Option<String>,
    },
    /// Close the session.
    Close,
    /// Navigate to a URL.
    #[serde(alias = "navigate")]
    Goto {
        /// Destination.
        url: String,
    },
    /// Reload the page.
    Reload {
        /// Bypass the cache.
        #[serde(rename = "ignoreCache", default)]
        ignore_cache: bool,
    },
    /// Click an element.
    Click {
        /// CSS selector.
        selector: String,
    },
    /// Set an input's value.
    Type {
        /// CSS selector.
        selector: String,
        /// New value.
        text: String,
    },
    /// Read an element's text.
    GetText {
        /// CSS selector.
        selector: String,
    },
    /// Wait until a selector matches.
    WaitForSelector {
        /// CSS selector.
        selector: String,
        /// Deadline in milliseconds; absent or zero means the default.
        #[serde(default)]
        timeout: Option<u64>,
    },
    /// Evaluate JavaScript.
    #[serde(alias = "evaluateasync")]
    Evaluate {
        /// Expression to evaluate.
        #[serde(alias = "expression")]
        code: String,
    },
    /// Serialized document.
    Html,
    /// Document title.
    Title,
    /// Main frame URL.
    Url,
    /// Viewport screenshot as base64 PNG.
    Screenshot,
    /// Page targets offered by the endpoint.
    List,
    /// Session status.
    Status,
    /// Browser version.
    Version,
}

/// Action names accepted by [`Action::from_request`].
const ACTION_NAMES: &[&str] = &[
    "connect",
    "close",
    "goto",
    "navigate",
    "reload",
    "click",
    "type",
    "gettext",
    "waitforselector",
    "evaluate",
    "evaluateasync",
    "html",
    "title",
    "url",
    "screenshot",
    "list",
    "status",
    "version",
];

impl Action {
    /// Parses a request object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the request is not an object,
    /// names no or an unknown action, or lacks a required argument.
    pub fn from_request(request: &Value) -> Result<Self> {
        let object = request
            .as_object()
            .ok_or_else(|| Error::invalid_argument("request must be a JSON object"))?;

        let name = object
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| Error::invalid_argument("missing string field `action`"))?;

        if !ACTION_NAMES.contains(&name.as_str()) {
            return Err(Error::invalid_argument(format!("Unknown action: {name}")));
        }

        let mut normalized = object.clone();
        normalized.insert("action".to_string(), Value::String(name.clone()));

        serde_json::from_value(Value::Object(normalized))
            .map_err(|e| Error::invalid_argument(format!("{name}: {e}")))
    }

    /// Returns the canonical action name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Close => "close",
            Self::Goto { .. } => "goto",
            Self::Reload { .. } => "reload",
            Self::Click { .. } => "click",
            Self::Type { .. } => "type",
            Self::GetText { .. } => "gettext",
            Self::WaitForSelector { .. } => "waitforselector",
            Self::Evaluate { .. } => "evaluate",
            Self::Html => "html",
            Self::Title => "title",
            Self::Url => "url",
            Self::Screenshot => "screenshot",
            Self::List => "list",
            Self::Status => "status",
            Self::Version => "version",
        }
    }

    /// Runs the action and returns its result fields.
    ///
    /// Page actions connect on first use through the client.
    ///
    /// # Errors
    ///
    /// Returns whatever the underlying client call returns.
    pub async fn run(self, client: &Client) -> Result<Map<String, Value>> {
        let page = client.page();

        let fields = match self {
            Self::Connect { target_id } => {
                let target = client.connect(target_id.as_deref()).await?;
                json!({ "id": target.id, "title": target.title, "url": target.url })
            }
            Self::Close => {
                client.close();
                json!({})
            }
            Self::Goto { url } => {
                page.goto(&url).await?;
                json!({ "url": url })
            }
            Self::Reload { ignore_cache } => {
                page.reload(ignore_cache).await?;
                json!({})
            }
            Self::Click { selector } => {
                page.click(&selector).await?;
                json!({})
            }
            Self::Type { selector, text } => {
                page.type_text(&selector, &text).await?;
                json!({})
            }
            Self::GetText { selector } => json!({ "text": page.text(&selector).await? }),
            Self::WaitForSelector { selector, timeout } => {
                let timeout = timeout
                    .filter(|ms| *ms > 0)
                    .map_or(DEFAULT_WAIT_TIMEOUT, Duration::from_millis);
                page.wait_for_selector_timeout(&selector, timeout).await?;
                json!({})
            }
            Self::Evaluate { code } => json!({ "result": page.evaluate(&code).await? }),
            Self::Html => json!({ "html": page.html().await? }),
            Self::Title => json!({ "title": page.title().await? }),
            Self::Url => json!({ "url": page.url().await? }),
            Self::Screenshot => json!({ "screenshot": page.screenshot().await? }),
            Self::List => {
                let tabs: Vec<Value> = client
                    .list_targets()
                    .await?
                    .into_iter()
                    .filter(|target| target.is_page())
                    .map(|target| json!({ "id": target.id, "title": target.title, "url": target.url }))
                    .collect();
                json!({ "tabs": tabs })
            }
            Self::Status => return Ok(status_fields(client)),
            Self::Version => serde_json::to_value(client.version().await?)?,
        };

        Ok(into_fields(fields))
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Parses and runs one request, always producing a reply object.
pub async fn dispatch(client: &Client, request: &Value) -> Value {
    let outcome = match Action::from_request(request) {
        Ok(action) => {
            let name = action.name();
            debug!(action = name, "Running action");
            action.run(client).await.inspect_err(|e| {
                warn!(action = name, kind = e.kind(), error = %e, "Action failed");
            })
        }
        Err(e) => {
            warn!(error = %e, "Rejected control request");
            Err(e)
        }
    };

    match outcome {
        Ok(fields) => success_reply(fields),
        Err(e) => error_reply(&e),
    }
}

/// Fields reported by the `status` action.
#[must_use]
pub fn status_fields(client: &Client) -> Map<String, Value> {
    let status = client.status();
    let target = status
        .target
        .as_ref()
        .map(|t| json!({ "id": t.id, "title": t.title, "url": t.url }))
        .unwrap_or(Value::Null);

    into_fields(json!({
        "connected": status.connected,
        "state": status.state,
        "reconnectAttempts": status.reconnect_attempts,
        "reconnecting": status.reconnecting,
        "exhausted": status.exhausted,
        "pending": client.pending_count(),
        "target": target,
    }))
}

/// Wraps result fields in a success reply.
#[must_use]
pub fn success_reply(fields: Map<String, Value>) -> Value {
    let mut reply = Map::with_capacity(fields.len() + 1);
    reply.insert("success".to_string(), Value::Bool(true));
    reply.extend(fields);
    Value::Object(reply)
}

/// Builds a failure reply.
#[must_use]
pub fn error_reply(error: &Error) -> Value {
    json!({
        "success": false,
        "error": error.to_string(),
        "kind": error.kind(),
    })
}

fn into_fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
