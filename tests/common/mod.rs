//! Shared fixtures: an in-process remote debugging endpoint and timers.
//!
//! The mock serves the HTTP listing (`/json/list`, `/json`, `/json/version`)
//! and a WebSocket per target that answers commands through a scriptable
//! responder.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cdp_bridge::{Client, ClientBuilder, SessionState, Timer};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

// ============================================================================
// Mock Targets
// ============================================================================

/// One listing entry served by the mock.
#[derive(Debug, Clone)]
pub struct MockTarget {
    pub id: String,
    pub title: String,
    pub url: String,
    pub kind: String,
}

impl MockTarget {
    pub fn page(id: &str, url: &str) -> Self {
        Self {
            id: id.to_string(),
            title: format!("Title {id}"),
            url: url.to_string(),
            kind: "page".to_string(),
        }
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = kind.to_string();
        self
    }
}

// ============================================================================
// Replies
// ============================================================================

/// How the mock answers one command.
#[derive(Debug, Clone)]
pub enum Reply {
    Result(Value),
    Error { code: i64, message: String },
    Silent,
}

type Responder = Box<dyn Fn(&str, &Value) -> Reply + Send + Sync>;

/// A command received by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub id: u64,
    pub method: String,
    pub params: Value,
}

/// Default answers that make every page action succeed.
pub fn default_reply(method: &str, _params: &Value) -> Reply {
    match method {
        "Runtime.evaluate" => Reply::Result(json!({
            "result": {"type": "string", "value": "Mock Title"}
        })),
        "Page.getFrameTree" => Reply::Result(json!({
            "frameTree": {"frame": {"id": "F1", "url": "https://example.com/"}}
        })),
        "Page.navigate" => Reply::Result(json!({"frameId": "F1", "loaderId": "L1"})),
        "Page.captureScreenshot" => Reply::Result(json!({"data": "iVBORw0KGgo="})),
        _ => Reply::Result(json!({})),
    }
}

// ============================================================================
// MockState
// ============================================================================

struct MockState {
    port: u16,
    targets: Mutex<Vec<MockTarget>>,
    available: AtomicBool,
    listing_requests: AtomicUsize,
    listing_delay: Mutex<Duration>,
    connections: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
    responder: Mutex<Responder>,
    kill: broadcast::Sender<()>,
    push: broadcast::Sender<String>,
}

impl MockState {
    fn listing(&self) -> Value {
        let entries: Vec<Value> = self
            .targets
            .lock()
            .iter()
            .map(|t| {
                json!({
                    "id": t.id,
                    "title": t.title,
                    "url": t.url,
                    "type": t.kind,
                    "description": "",
                    "devtoolsFrontendUrl": format!("/devtools/inspector.html?ws=127.0.0.1:{}/devtools/page/{}", self.port, t.id),
                    "webSocketDebuggerUrl": format!("ws://127.0.0.1:{}/devtools/page/{}", self.port, t.id),
                })
            })
            .collect();
        Value::Array(entries)
    }
}

// ============================================================================
// MockEndpoint
// ============================================================================

/// In-process remote debugging endpoint.
pub struct MockEndpoint {
    port: u16,
    state: Arc<MockState>,
    task: JoinHandle<()>,
}

impl MockEndpoint {
    /// Starts a mock with one ordinary page target `T1`.
    pub async fn start() -> Self {
        Self::start_with(vec![MockTarget::page("T1", "https://example.com/")]).await
    }

    /// Starts a mock serving `targets`.
    pub async fn start_with(targets: Vec<MockTarget>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock");
        let port = listener.local_addr().expect("mock addr").port();

        let (kill, _) = broadcast::channel(16);
        let (push, _) = broadcast::channel(64);
        let state = Arc::new(MockState {
            port,
            targets: Mutex::new(targets),
            available: AtomicBool::new(true),
            listing_requests: AtomicUsize::new(0),
            listing_delay: Mutex::new(Duration::ZERO),
            connections: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            responder: Mutex::new(Box::new(default_reply)),
            kill,
            push,
        });

        let app = Router::new()
            .route("/json/list", get(list_handler))
            .route("/json", get(list_handler))
            .route("/json/version", get(version_handler))
            .route("/devtools/page/:id", get(socket_handler))
            .with_state(Arc::clone(&state));

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { port, state, task }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Client builder pointed at this mock with short deadlines.
    pub fn client_builder(&self) -> ClientBuilder {
        Client::builder()
            .port(self.port)
            .discovery_timeout(Duration::from_secs(2))
            .connect_timeout(Duration::from_secs(2))
            .command_timeout(Duration::from_secs(5))
    }

    /// Replaces the command responder.
    pub fn respond_with<F>(&self, responder: F)
    where
        F: Fn(&str, &Value) -> Reply + Send + Sync + 'static,
    {
        *self.state.responder.lock() = Box::new(responder);
    }

    /// When unavailable, listing and upgrades answer 503.
    pub fn set_available(&self, available: bool) {
        self.state.available.store(available, Ordering::SeqCst);
    }

    /// Holds every listing response back by `delay`.
    pub fn set_listing_delay(&self, delay: Duration) {
        *self.state.listing_delay.lock() = delay;
    }

    /// Drops every open socket without a closing handshake.
    pub fn drop_connections(&self) {
        let _ = self.state.kill.send(());
    }

    /// Sends a raw frame to every open socket.
    pub fn push_frame(&self, frame: Value) {
        let _ = self.state.push.send(frame.to_string());
    }

    /// Sends an event to every open socket.
    pub fn push_event(&self, method: &str, params: Value) {
        self.push_frame(json!({"method": method, "params": params}));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.method).collect()
    }

    pub fn requests_for(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn listing_requests(&self) -> usize {
        self.state.listing_requests.load(Ordering::SeqCst)
    }
}

impl Drop for MockEndpoint {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_handler(State(state): State<Arc<MockState>>) -> Response {
    state.listing_requests.fetch_add(1, Ordering::SeqCst);
    let delay = *state.listing_delay.lock();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if !state.available.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(state.listing()).into_response()
}

async fn version_handler(State(state): State<Arc<MockState>>) -> Response {
    if !state.available.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    Json(json!({
        "Browser": "MockChrome/1.0",
        "Protocol-Version": "1.3",
        "User-Agent": "Mock",
        "webSocketDebuggerUrl": format!("ws://127.0.0.1:{}/devtools/browser/mock", state.port),
    }))
    .into_response()
}

async fn socket_handler(
    Path(id): Path<String>,
    State(state): State<Arc<MockState>>,
    ws: WebSocketUpgrade,
) -> Response {
    let known = state.targets.lock().iter().any(|t| t.id == id);
    if !known {
        return StatusCode::NOT_FOUND.into_response();
    }
    if !state.available.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    ws.on_upgrade(move |socket| serve_socket(socket, state))
        .into_response()
}

async fn serve_socket(mut socket: WebSocket, state: Arc<MockState>) {
    state.connections.fetch_add(1, Ordering::SeqCst);
    let mut kill = state.kill.subscribe();
    let mut push = state.push.subscribe();

    loop {
        tokio::select! {
            message = socket.recv() => {
                let text = match message {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };

                let Ok(request) = serde_json::from_str::<Value>(&text) else {
                    continue;
                };
                let id = request.get("id").cloned().unwrap_or(Value::Null);
                let method = request
                    .get("method")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let params = request.get("params").cloned().unwrap_or(Value::Null);

                state.requests.lock().push(RecordedRequest {
                    id: id.as_u64().unwrap_or_default(),
                    method: method.clone(),
                    params: params.clone(),
                });

                let reply = {
                    let responder = state.responder.lock();
                    responder(&method, &params)
                };

                let frame = match reply {
                    Reply::Result(result) => json!({"id": id, "result": result}),
                    Reply::Error { code, message } => {
                        json!({"id": id, "error": {"code": code, "message": message}})
                    }
                    Reply::Silent => continue,
                };

                if socket.send(Message::Text(frame.to_string())).await.is_err() {
                    break;
                }
            }

            _ = kill.recv() => break,

            frame = push.recv() => {
                if let Ok(frame) = frame
                    && socket.send(Message::Text(frame)).await.is_err()
                {
                    break;
                }
            }
        }
    }
}

// ============================================================================
// Timers
// ============================================================================

/// Timer that records requested delays and returns at once.
#[derive(Debug, Default)]
pub struct RecordingTimer {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingTimer {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

#[async_trait]
impl Timer for RecordingTimer {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().push(duration);
        tokio::task::yield_now().await;
    }
}

/// Timer whose sleeps end only when the test releases them.
#[derive(Debug)]
pub struct GatedTimer {
    requests: mpsc::UnboundedSender<(Duration, oneshot::Sender<()>)>,
}

/// Test side of a [`GatedTimer`].
pub struct TimerControl {
    requests: mpsc::UnboundedReceiver<(Duration, oneshot::Sender<()>)>,
}

/// One pending sleep.
pub struct Gate {
    pub duration: Duration,
    release: oneshot::Sender<()>,
}

impl Gate {
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

impl GatedTimer {
    pub fn new() -> (Arc<Self>, TimerControl) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { requests: tx }), TimerControl { requests: rx })
    }
}

impl TimerControl {
    /// Waits for the next sleep request.
    pub async fn next_sleep(&mut self) -> Gate {
        let (duration, release) = tokio::time::timeout(Duration::from_secs(5), self.requests.recv())
            .await
            .expect("timed out waiting for a backoff sleep")
            .expect("timer dropped");
        Gate { duration, release }
    }

    /// Returns `true` if a sleep was requested and not yet taken.
    pub fn has_pending(&mut self) -> bool {
        !self.requests.is_empty()
    }
}

#[async_trait]
impl Timer for GatedTimer {
    async fn sleep(&self, duration: Duration) {
        let (tx, rx) = oneshot::channel();
        if self.requests.send((duration, tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

// ============================================================================
// Waiting
// ============================================================================

/// Polls `condition` until it holds or five seconds pass.
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Waits until the state watch reports `expected`.
pub async fn wait_for_state(states: &mut watch::Receiver<SessionState>, expected: SessionState) {
    tokio::time::timeout(Duration::from_secs(5), states.wait_for(|s| *s == expected))
        .await
        .expect("state not reached within 5s")
        .expect("state channel closed");
}
