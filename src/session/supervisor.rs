//! Reconnection supervisor.
//!
//! Owns the session lifecycle: explicit connects, connect-on-first-use and
//! automatic reconnection with linear backoff after an unsolicited close.
//!
//! # Backoff
//!
//! The reconnect counter is incremented before every automatic attempt and
//! the attempt waits `backoff * counter` first. With a backoff of 1s the
//! waits are 1s, 2s, 3s and so on. A successful connect resets the counter
//! to 0. When an attempt fails and the counter has reached the configured
//! maximum the supervisor stops and every later command fails fast with
//! [`Error::PermanentDisconnect`] until [`Supervisor::connect`] is called.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::{Notify, watch};
use tracing::{debug, error, info, warn};

use crate::discovery::{Target, TargetDiscovery, select_target};
use crate::error::{Error, Result};
use crate::identifiers::TargetId;
use crate::transport::{CloseReason, Connection};

use super::dispatcher::Dispatcher;
use super::state::{SessionState, SessionStatus};
use super::timer::Timer;

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Limits for automatic reconnection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Automatic attempts before giving up. `0` disables reconnection.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `backoff * n`.
    pub backoff: Duration,
}

impl ReconnectPolicy {
    /// Default attempts before giving up.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

    /// Default base delay.
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

    /// Returns the wait before attempt number `attempt` (1-based).
    #[inline]
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            backoff: Self::DEFAULT_BACKOFF,
        }
    }
}

// ============================================================================
// SupervisorConfig
// ============================================================================

/// Connection settings used by the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Upper bound for one WebSocket handshake.
    pub connect_timeout: Duration,
    /// Reconnect limits.
    pub policy: ReconnectPolicy,
    /// Domains enabled after every connect, e.g. `Page`, `Runtime`.
    pub enable_domains: Vec<String>,
}

// ============================================================================
// Internal Types
// ============================================================================

/// How a connect attempt chooses its target.
enum Attempt {
    /// Caller-driven; an explicit id must exist.
    Manual(Option<TargetId>),
    /// Automatic; prefers the previous target, falls back to the policy.
    Reconnect(Option<TargetId>),
}

/// Mutable supervisor state, guarded by one lock.
#[derive(Debug, Default)]
struct SupervisorData {
    state: SessionState,
    attempts: u32,
    exhausted: bool,
    reconnecting: bool,
    target: Option<Target>,
    /// Bumped by explicit connect and close to cancel automatic attempts.
    epoch: u64,
}

// ============================================================================
// Supervisor
// ============================================================================

/// Drives connects and reconnects for one [`Dispatcher`].
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<SupervisorInner>,
}

struct SupervisorInner {
    discovery: TargetDiscovery,
    dispatcher: Dispatcher,
    timer: Arc<dyn Timer>,
    config: SupervisorConfig,
    data: Mutex<SupervisorData>,
    state_tx: watch::Sender<SessionState>,
    /// Serializes connect attempts.
    connect_lock: tokio::sync::Mutex<()>,
    /// Wakes a backoff wait early.
    cancel: Notify,
}

impl fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("data", &*self.inner.data.lock())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Creates a supervisor in the `Disconnected` state.
    #[must_use]
    pub fn new(
        discovery: TargetDiscovery,
        dispatcher: Dispatcher,
        timer: Arc<dyn Timer>,
        config: SupervisorConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);

        Self {
            inner: Arc::new(SupervisorInner {
                discovery,
                dispatcher,
                timer,
                config,
                data: Mutex::new(SupervisorData::default()),
                state_tx,
                connect_lock: tokio::sync::Mutex::new(()),
                cancel: Notify::new(),
            }),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Connects to `preferred`, or to the target chosen by the selection
    /// policy.
    ///
    /// Cancels any scheduled reconnect and clears the exhausted flag. When
    /// already connected to the requested target (or to any target if none
    /// is requested) the current target is returned unchanged. Otherwise the
    /// current connection is closed first. The reconnect counter resets only
    /// if this connect succeeds.
    ///
    /// # Errors
    ///
    /// - [`Error::Discovery`] if the listing cannot be fetched
    /// - [`Error::NoTarget`] / [`Error::TargetNotFound`] if nothing matches
    /// - [`Error::Connect`] if the handshake fails
    pub async fn connect(&self, preferred: Option<&TargetId>) -> Result<Target> {
        self.inner.take_over_reconnect();

        let _guard = self.inner.connect_lock.lock().await;
        let epoch = self.inner.epoch();

        {
            let data = self.inner.data.lock();
            if data.state.is_connected()
                && self.inner.dispatcher.is_attached()
                && let Some(current) = &data.target
                && preferred.is_none_or(|id| id == &current.id)
            {
                debug!(id = %current.id, "Already connected");
                return Ok(current.clone());
            }
        }

        self.inner.dispatcher.detach();
        self.inner
            .establish(Attempt::Manual(preferred.cloned()), epoch)
            .await
    }

    /// Makes sure a connection exists before a command is sent.
    ///
    /// Performs one immediate connect attempt when disconnected and idle.
    /// That attempt does not count toward the reconnect counter.
    ///
    /// # Errors
    ///
    /// - [`Error::PermanentDisconnect`] once reconnection has given up
    /// - [`Error::NotConnected`] while a reconnect is scheduled or running
    /// - the connect attempt's own error otherwise
    pub async fn ensure_connected(&self) -> Result<()> {
        if let Some(ready) = self.inner.readiness() {
            return ready;
        }

        let _guard = self.inner.connect_lock.lock().await;

        // Another caller may have connected while we waited.
        if let Some(ready) = self.inner.readiness() {
            return ready;
        }

        info!("Not connected, connecting on first use");
        let epoch = self.inner.epoch();
        self.inner
            .establish(Attempt::Manual(None), epoch)
            .await
            .map(|_| ())
    }

    /// Closes the connection and cancels any scheduled reconnect.
    ///
    /// An attempt already in flight is abandoned before it can publish
    /// `Connected`. A later command connects again on first use.
    pub fn close(&self) {
        self.inner.cancel_reconnect();
        self.inner.dispatcher.detach();

        let mut data = self.inner.data.lock();
        self.inner.set_state(&mut data, SessionState::Disconnected);
        info!("Session closed");
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.data.lock().state
    }

    /// Returns the current reconnect counter.
    #[inline]
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.data.lock().attempts
    }

    /// Returns `true` once automatic reconnection has given up.
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.inner.data.lock().exhausted
    }

    /// Returns the most recently attached target.
    #[must_use]
    pub fn current_target(&self) -> Option<Target> {
        self.inner.data.lock().target.clone()
    }

    /// Returns a snapshot of the session.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        let data = self.inner.data.lock();
        SessionStatus {
            state: data.state,
            connected: data.state.is_connected(),
            reconnect_attempts: data.attempts,
            exhausted: data.exhausted,
            reconnecting: data.reconnecting,
            target: data.target.clone(),
        }
    }

    /// Subscribes to lifecycle transitions.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state_tx.subscribe()
    }
}

// ============================================================================
// SupervisorInner
// ============================================================================

impl SupervisorInner {
    /// Updates the state and publishes it.
    fn set_state(&self, data: &mut SupervisorData, state: SessionState) {
        if data.state != state {
            debug!(from = %data.state, to = %state, "Session state changed");
        }
        data.state = state;
        self.state_tx.send_replace(state);
    }

    /// Invalidates scheduled automatic attempts and any attempt in flight.
    fn cancel_reconnect(&self) {
        {
            let mut data = self.data.lock();
            data.epoch = data.epoch.wrapping_add(1);
            data.reconnecting = false;
        }
        self.cancel.notify_waiters();
    }

    /// Clears the exhausted flag and stops automatic reconnection, if any,
    /// ahead of a manual connect.
    fn take_over_reconnect(&self) {
        {
            let mut data = self.data.lock();
            data.exhausted = false;
            if !data.reconnecting {
                return;
            }
            data.epoch = data.epoch.wrapping_add(1);
            data.reconnecting = false;
        }
        self.cancel.notify_waiters();
    }

    fn epoch(&self) -> u64 {
        self.data.lock().epoch
    }

    /// Answers `ensure_connected` without I/O when possible.
    fn readiness(&self) -> Option<Result<()>> {
        let data = self.data.lock();

        if data.state.is_connected() && self.dispatcher.is_attached() {
            return Some(Ok(()));
        }
        if data.exhausted {
            return Some(Err(Error::permanent_disconnect(data.attempts)));
        }
        if data.reconnecting {
            return Some(Err(Error::NotConnected));
        }
        None
    }

    // ========================================================================
    // Connecting
    // ========================================================================

    /// Runs one connect attempt. The caller holds `connect_lock`.
    ///
    /// The attempt is abandoned if the epoch moves past `epoch` before it
    /// completes.
    async fn establish(self: &Arc<Self>, attempt: Attempt, epoch: u64) -> Result<Target> {
        {
            let mut data = self.data.lock();
            self.set_state(&mut data, SessionState::Connecting);
        }

        match self.try_establish(attempt, epoch).await {
            Ok(target) => Ok(target),
            Err(e) => {
                let mut data = self.data.lock();
                if data.state == SessionState::Connecting {
                    self.set_state(&mut data, SessionState::Disconnected);
                }
                Err(e)
            }
        }
    }

    async fn try_establish(self: &Arc<Self>, attempt: Attempt, epoch: u64) -> Result<Target> {
        let target = self.choose_target(attempt).await?;

        if !target.is_attachable() {
            return Err(Error::connect(format!(
                "Target {} has no debugger URL; another client may be attached",
                target.id
            )));
        }

        let connection =
            Connection::open(&target.socket_address, self.config.connect_timeout).await?;

        let weak = Arc::downgrade(self);
        self.dispatcher.attach(
            connection,
            Box::new(move |reason| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_disconnect(reason);
                }
            }),
        );

        {
            let mut data = self.data.lock();
            if data.epoch != epoch {
                drop(data);
                self.dispatcher.detach();
                debug!(id = %target.id, "Connect attempt cancelled");
                return Err(Error::connect("Connect attempt cancelled"));
            }
            if !self.dispatcher.is_attached() {
                return Err(Error::connect("Connection closed during handshake"));
            }
            data.attempts = 0;
            data.exhausted = false;
            data.reconnecting = false;
            data.target = Some(target.clone());
            self.set_state(&mut data, SessionState::Connected);
        }

        info!(id = %target.id, url = %target.url, "Connected");
        self.enable_domains().await;
        Ok(target)
    }

    async fn choose_target(&self, attempt: Attempt) -> Result<Target> {
        match attempt {
            Attempt::Manual(preferred) => self.discovery.discover(preferred.as_ref()).await,
            Attempt::Reconnect(previous) => {
                let targets = self.discovery.list_targets().await?;
                let same = previous.and_then(|id| {
                    targets
                        .iter()
                        .find(|t| t.id == id && t.is_attachable())
                        .cloned()
                });
                match same {
                    Some(target) => Ok(target),
                    None => select_target(&targets, None),
                }
            }
        }
    }

    /// Enables the configured domains so their events start flowing.
    async fn enable_domains(&self) {
        for domain in &self.config.enable_domains {
            let method = format!("{domain}.enable");
            if let Err(e) = self
                .dispatcher
                .call_with_timeout(&method, json!({}), self.config.connect_timeout)
                .await
            {
                warn!(%method, error = %e, "Failed to enable domain");
            }
        }
    }

    // ========================================================================
    // Reconnecting
    // ========================================================================

    /// Lost handler of the attached connection.
    fn handle_disconnect(self: Arc<Self>, reason: CloseReason) {
        let (epoch, attempt) = {
            let mut data = self.data.lock();
            if !data.state.is_connected() {
                debug!(%reason, state = %data.state, "Ignoring close outside Connected");
                return;
            }

            warn!(%reason, "Connection lost");
            self.set_state(&mut data, SessionState::Disconnected);

            if !reason.is_unsolicited() {
                return;
            }

            if data.attempts >= self.config.policy.max_attempts {
                data.exhausted = true;
                error!(attempts = data.attempts, "Reconnection disabled or exhausted");
                return;
            }

            data.attempts += 1;
            data.reconnecting = true;
            (data.epoch, data.attempts)
        };

        tokio::spawn(self.reconnect_loop(epoch, attempt));
    }

    async fn reconnect_loop(self: Arc<Self>, epoch: u64, mut attempt: u32) {
        let max_attempts = self.config.policy.max_attempts;

        loop {
            let delay = self.config.policy.delay_for(attempt);
            info!(
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting"
            );

            let cancelled = self.cancel.notified();
            tokio::select! {
                () = self.timer.sleep(delay) => {}
                () = cancelled => {}
            }

            if self.epoch() != epoch {
                debug!(attempt, "Scheduled reconnect cancelled");
                return;
            }

            let _guard = self.connect_lock.lock().await;
            if self.epoch() != epoch {
                debug!(attempt, "Scheduled reconnect cancelled");
                return;
            }

            let previous = self.data.lock().target.as_ref().map(|t| t.id.clone());
            match self.establish(Attempt::Reconnect(previous), epoch).await {
                Ok(target) => {
                    info!(attempt, id = %target.id, "Reconnected");
                    return;
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Reconnect attempt failed");

                    let mut data = self.data.lock();
                    if data.epoch != epoch {
                        return;
                    }
                    if data.attempts >= max_attempts {
                        data.exhausted = true;
                        data.reconnecting = false;
                        error!(attempts = data.attempts, "Giving up reconnecting");
                        return;
                    }
                    data.attempts += 1;
                    attempt = data.attempts;
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
