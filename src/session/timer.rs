//! Timer abstraction for reconnect backoff.
//!
//! The supervisor never calls `tokio::time::sleep` directly so tests can
//! observe and control the backoff schedule without waiting in real time.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

/// Source of backoff delays.
#[async_trait]
pub trait Timer: Send + Sync + fmt::Debug + 'static {
    /// Completes after `duration`.
    async fn sleep(&self, duration: Duration);
}

/// [`Timer`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
