//! Timer service used by the job tracker.
//!
//! Pollers never call `tokio::time::sleep` directly so tests can substitute
//! a timer and advance time deterministically.

use std::time::Duration;

use async_trait::async_trait;

/// Deferred re-invocation.
#[async_trait]
pub trait Timer: Send + Sync + 'static {
    async fn sleep(&self, duration: Duration);
}

/// Timer backed by the tokio clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

#[async_trait]
impl Timer for TokioTimer {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
