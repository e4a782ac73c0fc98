//! HTTP binding for the control surface.
//!
//! | Route | Method | Body | Reply |
//! |-------|--------|------|-------|
//! | `/` | POST | action object | action reply |
//! | `/action` | POST | action object | action reply |
//! | `/status` | GET | | `status` action reply |
//! | `/health` | GET | | `{"status": "ok", "version": ...}` |
//!
//! Action replies are always HTTP 200; success or failure is in the body.
//! CORS is permissive so browser pages and extensions can call the API.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::client::Client;
use crate::error::{Error, Result};

use super::action::{dispatch, error_reply, status_fields, success_reply};

// ============================================================================
// Router
// ============================================================================

/// Builds the control router for `client`.
#[must_use]
pub fn router(client: Client) -> Router {
    Router::new()
        .route("/", post(action_handler))
        .route("/action", post(action_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(client)
}

/// Serves the control API on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns [`Error::Io`] if the server fails.
pub async fn serve<F>(listener: TcpListener, client: Client, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "Control API listening");
    }

    axum::serve(listener, router(client))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(Error::Io)
}

// ============================================================================
// Handlers
// ============================================================================

async fn action_handler(State(client): State<Client>, body: Bytes) -> Json<Value> {
    let request = if body.is_empty() {
        json!({})
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(request) => request,
            Err(e) => {
                return Json(error_reply(&Error::invalid_argument(format!(
                    "request body is not valid JSON: {e}"
                ))));
            }
        }
    };

    Json(dispatch(&client, &request).await)
}

async fn status_handler(State(client): State<Client>) -> Json<Value> {
    Json(success_reply(status_fields(&client)))
}

async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
