//! Command dispatcher.
//!
//! Assigns correlation ids, tracks in-flight commands and settles each one
//! exactly once: with its reply, a timeout, or a connection loss.
//!
//! # Settlement
//!
//! | Outcome | Result |
//! |---------|--------|
//! | Reply with `result` | `Ok(result)` |
//! | Reply with `error` | [`Error::Protocol`] |
//! | No reply before the deadline | [`Error::RequestTimeout`] |
//! | Transport closed first | [`Error::ConnectionLost`] |
//!
//! Frames carrying a `method` but no `id` are events. They are published to
//! subscribers and never settle a pending command.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{CommandId, CommandIdGenerator};
use crate::protocol::{Command, Event, Incoming, Request};
use crate::transport::{CloseReason, Connection};

// ============================================================================
// Constants
// ============================================================================

/// Maximum in-flight commands before new ones are rejected.
pub const MAX_PENDING_COMMANDS: usize = 1000;

// ============================================================================
// Types
// ============================================================================

/// Called once when the attached connection ends on its own.
pub type LostHandler = Box<dyn FnOnce(CloseReason) + Send>;

/// One in-flight command.
struct PendingCommand {
    /// Protocol method, for logging.
    method: String,
    /// When the frame was queued.
    created_at: Instant,
    /// Connection generation the frame was sent on.
    generation: u64,
    /// Settles the caller's future.
    reply_tx: oneshot::Sender<Result<Value>>,
}

/// Pending commands ordered by id, which is also issue order.
type PendingMap = BTreeMap<CommandId, PendingCommand>;

/// The attached connection and its generation.
struct Attached {
    generation: u64,
    connection: Connection,
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Correlates commands with replies over the attached connection.
///
/// At most one connection is attached at a time. Ids come from a single
/// generator that lives as long as the dispatcher, so an id is never reused
/// across reconnects.
///
/// # Thread Safety
///
/// `Dispatcher` is `Send + Sync` and cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Correlation id source.
    ids: CommandIdGenerator,
    /// In-flight commands.
    pending: Mutex<PendingMap>,
    /// Currently attached connection.
    attached: RwLock<Option<Attached>>,
    /// Attachment counter.
    generations: AtomicU64,
    /// Event fan-out.
    events: broadcast::Sender<Event>,
    /// Deadline applied when the caller does not give one.
    default_timeout: Duration,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("attached", &self.is_attached())
            .field("pending", &self.pending_count())
            .field("default_timeout", &self.inner.default_timeout)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with no connection attached.
    ///
    /// `event_capacity` bounds how far a slow event subscriber may lag
    /// before it starts missing events.
    #[must_use]
    pub fn new(default_timeout: Duration, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));

        Self {
            inner: Arc::new(DispatcherInner {
                ids: CommandIdGenerator::new(),
                pending: Mutex::new(PendingMap::new()),
                attached: RwLock::new(None),
                generations: AtomicU64::new(0),
                events,
                default_timeout,
            }),
        }
    }

    // ========================================================================
    // Connection Management
    // ========================================================================

    /// Attaches `connection`, replacing any previous one.
    ///
    /// When `connection` later closes, every command sent on it is failed
    /// with [`Error::ConnectionLost`] in issue order. If it was still the
    /// attached connection at that point, `on_lost` runs afterwards with the
    /// close reason. Connections removed with [`detach`](Self::detach) never
    /// reach `on_lost`.
    pub fn attach(&self, connection: Connection, on_lost: LostHandler) {
        let generation = self.inner.generations.fetch_add(1, Ordering::AcqRel) + 1;

        let previous = self.inner.attached.write().replace(Attached {
            generation,
            connection: connection.clone(),
        });
        if let Some(previous) = previous {
            debug!(url = %previous.connection.url(), "Replacing attached connection");
            previous.connection.close();
            self.inner.fail_pending(previous.generation);
        }

        debug!(url = %connection.url(), generation, "Connection attached");

        let weak = Arc::downgrade(&self.inner);
        connection.set_frame_handler(Box::new(move |text| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_frame(text);
            }
        }));

        connection.set_error_handler(Box::new(|message| {
            warn!(error = %message, "Transport error");
        }));

        let weak: Weak<DispatcherInner> = Arc::downgrade(&self.inner);
        connection.set_close_handler(Box::new(move |reason| {
            let Some(inner) = weak.upgrade() else {
                return;
            };

            let was_current = inner.clear_if_current(generation);
            let failed = inner.fail_pending(generation);
            if !failed.is_empty() {
                debug!(count = failed.len(), %reason, "Failed in-flight commands");
            }

            if was_current {
                on_lost(reason);
            }
        }));
    }

    /// Detaches and closes the current connection without notifying its
    /// lost handler.
    ///
    /// Commands still in flight on it fail with [`Error::ConnectionLost`].
    pub fn detach(&self) {
        let previous = self.inner.attached.write().take();
        if let Some(previous) = previous {
            debug!(url = %previous.connection.url(), "Connection detached");
            previous.connection.close();
            self.inner.fail_pending(previous.generation);
        }
    }

    /// Returns `true` if a connection is attached.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.attached.read().is_some()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Sends a raw command and waits for its reply with the default deadline.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if no connection is attached
    /// - [`Error::Protocol`] if the endpoint rejects the command, or too many
    ///   commands are in flight
    /// - [`Error::RequestTimeout`] if no reply arrives in time
    /// - [`Error::ConnectionLost`] if the connection closes first
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.call_with_timeout(method, params, self.inner.default_timeout)
            .await
    }

    /// Sends a raw command and waits for its reply.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value> {
        let (id, mut reply_rx) = self.submit(method, params)?;

        match timeout(deadline, &mut reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::ConnectionLost),
            Err(_) => {
                let removed = self.inner.pending.lock().remove(&id);

                // A reply that raced with the deadline wins.
                if removed.is_none()
                    && let Ok(result) = reply_rx.try_recv()
                {
                    return result;
                }

                let timeout_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
                warn!(%id, method, timeout_ms, "Command timed out");
                Err(Error::request_timeout(id, method, timeout_ms))
            }
        }
    }

    /// Sends a typed command with the default deadline.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call), plus [`Error::Json`] if the command
    /// cannot be serialized.
    pub async fn execute(&self, command: &Command) -> Result<Value> {
        let (method, params) = command.to_parts()?;
        self.call(&method, params).await
    }

    /// Registers a pending command and queues its frame.
    fn submit(
        &self,
        method: &str,
        params: Value,
    ) -> Result<(CommandId, oneshot::Receiver<Result<Value>>)> {
        let (reply_tx, reply_rx) = oneshot::channel();

        // Held across send so a reply cannot be processed before its entry
        // exists.
        let mut pending = self.inner.pending.lock();
        let guard = self.inner.attached.read();
        let Some(attached) = guard.as_ref() else {
            return Err(Error::NotConnected);
        };

        if pending.len() >= MAX_PENDING_COMMANDS {
            warn!(
                pending = pending.len(),
                max = MAX_PENDING_COMMANDS,
                "Too many pending commands"
            );
            return Err(Error::protocol(format!(
                "Too many pending commands: {}/{}",
                pending.len(),
                MAX_PENDING_COMMANDS
            )));
        }

        let id = self.inner.ids.generate();
        let frame = Request::new(id, method, params).to_frame()?;

        pending.insert(
            id,
            PendingCommand {
                method: method.to_string(),
                created_at: Instant::now(),
                generation: attached.generation,
                reply_tx,
            },
        );

        if let Err(e) = attached.connection.send(frame) {
            pending.remove(&id);
            return Err(e);
        }

        trace!(%id, method, "Command sent");
        Ok((id, reply_rx))
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Subscribes to inbound events.
    ///
    /// Only events received after this call are delivered.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    /// Returns the number of in-flight commands.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Returns the id the next command will get.
    #[inline]
    #[must_use]
    pub fn next_id(&self) -> CommandId {
        self.inner.ids.peek()
    }

    /// Returns the deadline used by [`call`](Self::call).
    #[inline]
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.inner.default_timeout
    }

    /// Routes one inbound text frame.
    ///
    /// Exposed for tests that feed frames without a socket.
    pub fn handle_frame(&self, text: &str) {
        self.inner.handle_frame(text);
    }
}

// ============================================================================
// DispatcherInner
// ============================================================================

impl DispatcherInner {
    fn handle_frame(&self, text: &str) {
        match Incoming::parse(text) {
            Ok(Incoming::Response(response)) => {
                let entry = self.pending.lock().remove(&response.id);
                match entry {
                    Some(command) => {
                        trace!(
                            id = %response.id,
                            method = %command.method,
                            elapsed_ms = command.created_at.elapsed().as_millis() as u64,
                            "Reply received"
                        );
                        let _ = command.reply_tx.send(response.into_result());
                    }
                    None => {
                        warn!(id = %response.id, "Reply for unknown or expired command");
                    }
                }
            }

            Ok(Incoming::Event(event)) => {
                trace!(method = %event.method, "Event received");
                // No subscribers is fine.
                let _ = self.events.send(event);
            }

            Err(e) => {
                warn!(error = %e, len = text.len(), "Dropping malformed frame");
            }
        }
    }

    /// Clears the attached slot if it still holds `generation`.
    fn clear_if_current(&self, generation: u64) -> bool {
        let mut attached = self.attached.write();
        match attached.as_ref() {
            Some(current) if current.generation == generation => {
                *attached = None;
                true
            }
            _ => false,
        }
    }

    /// Fails every command sent on `generation`, oldest first.
    fn fail_pending(&self, generation: u64) -> Vec<CommandId> {
        let lost: Vec<(CommandId, PendingCommand)> = {
            let mut pending = self.pending.lock();
            let ids: Vec<CommandId> = pending
                .iter()
                .filter(|(_, command)| command.generation == generation)
                .map(|(id, _)| *id)
                .collect();

            ids.into_iter()
                .filter_map(|id| pending.remove(&id).map(|command| (id, command)))
                .collect()
        };

        lost.into_iter()
            .map(|(id, command)| {
                let _ = command.reply_tx.send(Err(Error::ConnectionLost));
                id
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
