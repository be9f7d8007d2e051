//! Shared provider traits for dependency injection.
//!
//! This module contains common traits used across the codebase to enable
//! testability through dependency injection. By abstracting external
//! dependencies behind traits, modules can be tested in isolation with
//! mock implementations.

use async_trait::async_trait;
use std::time::Duration;

/// Trait for providing timestamps.
///
/// This abstraction enables deterministic testing of time-dependent behavior
/// by allowing injection of mock time providers.
///
/// # Example
///
/// ```
/// use birdsong::providers::{TimeProvider, SystemTimeProvider};
///
/// // Production code uses SystemTimeProvider
/// let provider = SystemTimeProvider;
/// let timestamp = provider.now();
/// assert!(timestamp > 0);
/// ```
pub trait TimeProvider: Send + Sync {
    /// Returns the current Unix timestamp in seconds.
    fn now(&self) -> u64;
}

/// Default time provider using system time.
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Trait for producing request nonces.
///
/// The OAuth signer needs a fresh nonce per request; injecting the source
/// keeps signatures reproducible in tests.
pub trait NonceProvider: Send + Sync {
    /// Returns a unique string for a single request.
    fn nonce(&self) -> String;
}

/// Default nonce provider backed by UUIDv4.
pub struct UuidNonceProvider;

impl NonceProvider for UuidNonceProvider {
    fn nonce(&self) -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Trait for waiting out a delay.
///
/// The publish retry loop waits a fixed interval between attempts; tests
/// inject a recording implementation so no real time passes.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Default sleeper backed by the Tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
