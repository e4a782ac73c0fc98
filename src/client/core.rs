//! Client coordinator.
//!
//! The [`Client`] owns one remote debugging session: the discovery client,
//! the command dispatcher and the reconnection supervisor.
//!
//! # Example
//!
//! ```no_run
//! use cdp_bridge::Client;
//!
//! # async fn example() -> cdp_bridge::Result<()> {
//! let client = Client::builder().port(9222).build()?;
//! client.connect(None).await?;
//!
//! let page = client.page();
//! page.goto("https://example.com").await?;
//! println!("{}", page.title().await?);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::debug;
use url::Url;

use crate::browser::Page;
use crate::discovery::{BrowserVersion, Target, TargetDiscovery};
use crate::error::Result;
use crate::identifiers::TargetId;
use crate::protocol::{Command, Event};
use crate::session::{
    Dispatcher, ReconnectPolicy, SessionState, SessionStatus, Supervisor, SupervisorConfig, Timer,
};

use super::builder::ClientBuilder;

// ============================================================================
// ClientConfig
// ============================================================================

/// Validated settings produced by [`ClientBuilder`].
#[derive(Debug)]
pub(crate) struct ClientConfig {
    pub endpoint: Url,
    pub command_timeout: Duration,
    pub discovery_timeout: Duration,
    pub connect_timeout: Duration,
    pub policy: ReconnectPolicy,
    pub enable_domains: Vec<String>,
    pub event_capacity: usize,
    pub timer: Arc<dyn Timer>,
}

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
pub(crate) struct ClientInner {
    /// Target listing client.
    pub discovery: TargetDiscovery,
    /// Command correlation.
    pub dispatcher: Dispatcher,
    /// Connection lifecycle.
    pub supervisor: Supervisor,
}

// ============================================================================
// Client
// ============================================================================

/// Remote debugging client.
///
/// Commands connect on first use and survive connection drops through
/// automatic reconnection.
///
/// # Thread Safety
///
/// `Client` is `Send + Sync` and cheap to clone; clones share one session.
#[derive(Clone)]
pub struct Client {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

// ============================================================================
// Client - Display
// ============================================================================

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", &self.endpoint().as_str())
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Public API
// ============================================================================

impl Client {
    /// Creates a configuration builder for the client.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from validated settings.
    pub(crate) fn new(config: ClientConfig) -> Result<Self> {
        let discovery = TargetDiscovery::new(config.endpoint, config.discovery_timeout)?;
        let dispatcher = Dispatcher::new(config.command_timeout, config.event_capacity);
        let supervisor = Supervisor::new(
            discovery.clone(),
            dispatcher.clone(),
            config.timer,
            SupervisorConfig {
                connect_timeout: config.connect_timeout,
                policy: config.policy,
                enable_domains: config.enable_domains,
            },
        );

        debug!(endpoint = %discovery.base_url(), "Client created");

        Ok(Self {
            inner: Arc::new(ClientInner {
                discovery,
                dispatcher,
                supervisor,
            }),
        })
    }

    /// Returns the endpoint base URL.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        self.inner.discovery.base_url()
    }

    // ========================================================================
    // Connection
    // ========================================================================

    /// Connects to `target_id`, or to the target picked by the selection
    /// policy.
    ///
    /// # Errors
    ///
    /// - [`Error::Discovery`](crate::Error::Discovery) if listing fails
    /// - [`Error::NoTarget`](crate::Error::NoTarget) or
    ///   [`Error::TargetNotFound`](crate::Error::TargetNotFound)
    /// - [`Error::Connect`](crate::Error::Connect) if the handshake fails
    pub async fn connect(&self, target_id: Option<&str>) -> Result<Target> {
        let target_id = target_id.map(TargetId::from);
        self.inner.supervisor.connect(target_id.as_ref()).await
    }

    /// Closes the session. The next command connects again.
    pub fn close(&self) {
        self.inner.supervisor.close();
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Sends a raw protocol command with the default deadline.
    ///
    /// # Errors
    ///
    /// Any connect error from connect-on-first-use, plus the dispatcher's
    /// [`Error::RequestTimeout`](crate::Error::RequestTimeout),
    /// [`Error::Protocol`](crate::Error::Protocol) and
    /// [`Error::ConnectionLost`](crate::Error::ConnectionLost).
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.inner.supervisor.ensure_connected().await?;
        self.inner.dispatcher.call(method, params).await
    }

    /// Sends a raw protocol command with an explicit deadline.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub async fn call_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value> {
        self.inner.supervisor.ensure_connected().await?;
        self.inner
            .dispatcher
            .call_with_timeout(method, params, timeout)
            .await
    }

    /// Sends a typed command with the default deadline.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call).
    pub async fn execute(&self, command: &Command) -> Result<Value> {
        self.inner.supervisor.ensure_connected().await?;
        self.inner.dispatcher.execute(command).await
    }

    /// Returns a page action handle bound to this client.
    #[inline]
    #[must_use]
    pub fn page(&self) -> Page {
        Page::new(self.clone())
    }

    // ========================================================================
    // Discovery
    // ========================================================================

    /// Lists the endpoint's targets. Does not require a connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`](crate::Error::Discovery) on failure.
    pub async fn list_targets(&self) -> Result<Vec<Target>> {
        self.inner.discovery.list_targets().await
    }

    /// Fetches the browser version. Does not require a connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`](crate::Error::Discovery) on failure.
    pub async fn version(&self) -> Result<BrowserVersion> {
        self.inner.discovery.version().await
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Returns the current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.supervisor.state()
    }

    /// Returns a snapshot of the session.
    #[inline]
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner.supervisor.status()
    }

    /// Returns the most recently attached target.
    #[inline]
    #[must_use]
    pub fn current_target(&self) -> Option<Target> {
        self.inner.supervisor.current_target()
    }

    /// Returns the number of in-flight commands.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.dispatcher.pending_count()
    }

    /// Subscribes to protocol events.
    #[inline]
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.inner.dispatcher.subscribe()
    }

    /// Subscribes to lifecycle transitions.
    #[inline]
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.inner.supervisor.subscribe_state()
    }
}

// ============================================================================
// Tests
// ============================================================================
