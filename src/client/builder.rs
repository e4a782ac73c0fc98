//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`Client`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use cdp_bridge::Client;
//!
//! # fn example() -> cdp_bridge::Result<()> {
//! let client = Client::builder()
//!     .host("127.0.0.1")
//!     .port(9222)
//!     .command_timeout(Duration::from_secs(10))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::session::{ReconnectPolicy, Timer, TokioTimer};

use super::core::{Client, ClientConfig};

// ============================================================================
// Constants
// ============================================================================

/// Default endpoint host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default remote debugging port.
pub const DEFAULT_PORT: u16 = 9222;

/// Default deadline for one command.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Default deadline for one discovery request.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default deadline for one WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default event buffer per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Domains enabled after every connect by default.
pub const DEFAULT_ENABLE_DOMAINS: &[&str] = &["Page", "Runtime", "Log"];

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`] instance.
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    /// Explicit endpoint URL; overrides host and port.
    endpoint: Option<String>,
    /// Endpoint host.
    host: String,
    /// Endpoint port.
    port: u16,
    /// Per-command deadline.
    command_timeout: Duration,
    /// Per-request discovery deadline.
    discovery_timeout: Duration,
    /// Per-handshake deadline.
    connect_timeout: Duration,
    /// Reconnect limits.
    policy: ReconnectPolicy,
    /// Domains enabled after connect.
    enable_domains: Vec<String>,
    /// Event buffer per subscriber.
    event_capacity: usize,
    /// Backoff timer; tokio's when unset.
    timer: Option<Arc<dyn Timer>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            policy: ReconnectPolicy::default(),
            enable_domains: DEFAULT_ENABLE_DOMAINS
                .iter()
                .map(|domain| (*domain).to_string())
                .collect(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            timer: None,
        }
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the remote debugging port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the full endpoint URL, e.g. `http://10.0.0.5:9222/`.
    ///
    /// Takes precedence over [`host`](Self::host) and [`port`](Self::port).
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Sets the default per-command deadline.
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Sets the deadline for one discovery request.
    #[inline]
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Sets the deadline for one WebSocket handshake.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets how many automatic reconnect attempts are made before giving up.
    ///
    /// `0` disables automatic reconnection.
    #[inline]
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.policy.max_attempts = attempts;
        self
    }

    /// Sets the base reconnect delay. Attempt `n` waits `backoff * n`.
    #[inline]
    #[must_use]
    pub fn reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.policy.backoff = backoff;
        self
    }

    /// Replaces the domains enabled after every connect.
    #[must_use]
    pub fn enable_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enable_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Sets how many events a subscriber may lag behind before missing some.
    #[inline]
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Replaces the backoff timer.
    #[inline]
    #[must_use]
    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Builds the client with validation.
    ///
    /// Does not touch the network; the first connect happens on
    /// [`Client::connect`] or on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint is malformed or a setting
    /// is out of range.
    pub fn build(self) -> Result<Client> {
        let endpoint = self.validate_endpoint()?;
        self.validate_limits()?;

        Client::new(ClientConfig {
            endpoint,
            command_timeout: self.command_timeout,
            discovery_timeout: self.discovery_timeout,
            connect_timeout: self.connect_timeout,
            policy: self.policy,
            enable_domains: self.enable_domains,
            event_capacity: self.event_capacity,
            timer: self.timer.unwrap_or_else(|| Arc::new(TokioTimer)),
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Resolves the endpoint base URL.
    fn validate_endpoint(&self) -> Result<Url> {
        let raw = match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => {
                if self.host.trim().is_empty() {
                    return Err(Error::config("Endpoint host must not be empty"));
                }
                if self.port == 0 {
                    return Err(Error::config("Endpoint port must not be 0"));
                }
                format!("http://{}:{}/", self.host, self.port)
            }
        };

        let mut url = Url::parse(&raw)
            .map_err(|e| Error::config(format!("Invalid endpoint {raw:?}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "Endpoint must be http or https, got {raw}"
            )));
        }

        // Discovery paths are joined relative to the base.
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }

    /// Validates timeouts and capacities.
    fn validate_limits(&self) -> Result<()> {
        for (name, value) in [
            ("command_timeout", self.command_timeout),
            ("discovery_timeout", self.discovery_timeout),
            ("connect_timeout", self.connect_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::config(format!("{name} must be greater than zero")));
            }
        }

        if self.event_capacity == 0 {
            return Err(Error::config("event_capacity must be greater than zero"));
        }

        if self
            .enable_domains
            .iter()
            .any(|domain| domain.trim().is_empty() || domain.contains('.'))
        {
            return Err(Error::config(format!(
                "Invalid domain in enable_domains: {:?}",
                self.enable_domains
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
