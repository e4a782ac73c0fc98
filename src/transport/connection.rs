//! WebSocket connection and event loop.
//!
//! A [`Connection`] owns exactly one WebSocket to a target's debugger URL.
//! It moves raw text frames and reports lifecycle changes; correlation of
//! replies to commands lives one layer up in the dispatcher.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames from the endpoint (passed to the frame handler)
//! - Outgoing frames queued by [`Connection::send`], in queue order
//! - Close and error detection (passed to the lifecycle handlers)

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// WebSocket stream to a debugger URL.
type DebuggerStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Inbound frame callback.
pub type FrameHandler = Box<dyn Fn(&str) + Send + Sync>;

/// Close callback. Fires exactly once per connection.
pub type CloseHandler = Box<dyn FnOnce(CloseReason) + Send>;

/// Transport error callback.
pub type ErrorHandler = Box<dyn Fn(&str) + Send + Sync>;

// ============================================================================
// CloseReason
// ============================================================================

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// [`Connection::close`] was called.
    Local,
    /// The endpoint closed the socket or the stream ended.
    Remote,
    /// A read or write failed.
    Error(String),
}

impl CloseReason {
    /// Returns `true` unless the close was requested locally.
    #[inline]
    #[must_use]
    pub fn is_unsolicited(&self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("closed locally"),
            Self::Remote => f.write_str("closed by remote"),
            Self::Error(message) => write!(f, "transport error: {message}"),
        }
    }
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a text frame.
    Send(String),
    /// Close the socket.
    Shutdown,
}

// ============================================================================
// Handlers
// ============================================================================

/// Close handler slot; remembers the reason once the loop has ended.
#[derive(Default)]
struct CloseSlot {
    handler: Option<CloseHandler>,
    reason: Option<CloseReason>,
}

/// Callbacks shared with the event loop.
#[derive(Default)]
struct Handlers {
    frame: Mutex<Option<FrameHandler>>,
    error: Mutex<Option<ErrorHandler>>,
    close: Mutex<CloseSlot>,
}

impl Handlers {
    fn on_frame(&self, text: &str) {
        let guard = self.frame.lock();
        match guard.as_ref() {
            Some(handler) => handler(text),
            None => trace!(len = text.len(), "Frame dropped, no handler registered"),
        }
    }

    fn on_error(&self, message: &str) {
        if let Some(handler) = self.error.lock().as_ref() {
            handler(message);
        }
    }

    fn on_close(&self, reason: CloseReason) {
        let handler = {
            let mut slot = self.close.lock();
            slot.reason = Some(reason.clone());
            slot.handler.take()
        };

        if let Some(handler) = handler {
            handler(reason);
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to one inspectable target.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync` and cheap to clone; clones share the same
/// socket and event loop.
pub struct Connection {
    /// Debugger URL this connection was opened against.
    url: Arc<str>,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Cleared as soon as the connection starts closing.
    open: Arc<AtomicBool>,
    /// Callbacks (shared with event loop).
    handlers: Arc<Handlers>,
}

impl Clone for Connection {
    fn clone(&self) -> Self {
        Self {
            url: Arc::clone(&self.url),
            command_tx: self.command_tx.clone(),
            open: Arc::clone(&self.open),
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Opens a WebSocket to `socket_address`.
    ///
    /// Spawns the event loop task internally.
    ///
    /// # Errors
    ///
    /// - [`Error::Connect`] if the address is not a `ws`/`wss` URL
    /// - [`Error::Connect`] if the handshake fails or exceeds `connect_timeout`
    pub async fn open(socket_address: &str, connect_timeout: Duration) -> Result<Self> {
        let url = Url::parse(socket_address)
            .map_err(|e| Error::connect(format!("Invalid socket address {socket_address:?}: {e}")))?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::connect(format!(
                "Unsupported socket scheme {:?} in {socket_address}",
                url.scheme()
            )));
        }

        debug!(url = %url, "Opening WebSocket");

        let (ws_stream, _response) = timeout(connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| {
                Error::connect(format!(
                    "Handshake with {url} timed out after {}ms",
                    connect_timeout.as_millis()
                ))
            })?
            .map_err(|e| Error::connect(format!("{url}: {e}")))?;

        debug!(url = %url, "WebSocket connected");

        Ok(Self::from_stream(url.as_str(), ws_stream))
    }

    /// Wraps an established stream and spawns its event loop.
    fn from_stream(url: &str, ws_stream: DebuggerStream) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(true));
        let handlers = Arc::new(Handlers::default());

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&open),
            Arc::clone(&handlers),
        ));

        Self {
            url: Arc::from(url),
            command_tx,
            open,
            handlers,
        }
    }

    /// Returns the debugger URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns `true` while the socket is usable.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Sets the inbound frame handler, replacing any previous one.
    pub fn set_frame_handler(&self, handler: FrameHandler) {
        *self.handlers.frame.lock() = Some(handler);
    }

    /// Sets the transport error handler, replacing any previous one.
    pub fn set_error_handler(&self, handler: ErrorHandler) {
        *self.handlers.error.lock() = Some(handler);
    }

    /// Sets the close handler, replacing any previous one.
    ///
    /// If the connection has already closed the handler runs immediately.
    pub fn set_close_handler(&self, handler: CloseHandler) {
        let reason = {
            let mut slot = self.handlers.close.lock();
            match slot.reason.clone() {
                Some(reason) => reason,
                None => {
                    slot.handler = Some(handler);
                    return;
                }
            }
        };

        handler(reason);
    }

    /// Queues a text frame for sending.
    ///
    /// Frames are written in the order they were queued.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] if the connection is closed or closing.
    pub fn send(&self, frame: String) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }

        self.command_tx
            .send(ConnectionCommand::Send(frame))
            .map_err(|_| Error::NotConnected)
    }

    /// Closes the connection.
    ///
    /// Idempotent. The close handler receives [`CloseReason::Local`] unless
    /// the connection had already ended for another reason.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!(url = %self.url, "Closing connection");
            let _ = self.command_tx.send(ConnectionCommand::Shutdown);
        }
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: DebuggerStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        open: Arc<AtomicBool>,
        handlers: Arc<Handlers>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        let reason = loop {
            tokio::select! {
                // Incoming frames from the endpoint
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            handlers.on_frame(text.as_str());
                        }

                        Some(Ok(Message::Binary(data))) => {
                            match std::str::from_utf8(&data) {
                                Ok(text) => handlers.on_frame(text),
                                Err(_) => warn!(len = data.len(), "Dropping non-UTF-8 binary frame"),
                            }
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by remote");
                            break CloseReason::Remote;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            let message = e.to_string();
                            handlers.on_error(&message);
                            break CloseReason::Error(message);
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break CloseReason::Remote;
                        }

                        // Ignore Ping, Pong, raw Frame
                        _ => {}
                    }
                }

                // Frames and shutdown from the local side
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(frame)) => {
                            trace!(len = frame.len(), "Sending frame");
                            if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
                                error!(error = %e, "WebSocket write failed");
                                let message = e.to_string();
                                handlers.on_error(&message);
                                break CloseReason::Error(message);
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break CloseReason::Local;
                        }

                        None => {
                            debug!("All connection handles dropped");
                            let _ = ws_write.close().await;
                            break CloseReason::Local;
                        }
                    }
                }
            }
        };

        open.store(false, Ordering::Release);
        debug!(%reason, "Event loop terminated");
        handlers.on_close(reason);
    }
}

// ============================================================================
// Tests
// ============================================================================
