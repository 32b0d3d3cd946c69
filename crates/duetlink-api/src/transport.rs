// Shared transport configuration and request bookkeeping.
//
// Holds the knobs for building the reqwest::Client, the retry policy that
// wraps every request, and the in-flight registry used to cancel all
// outstanding requests in one go when a session is torn down.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Session timeout assumed until the controller announces its own.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_millis(8000);

/// TLS verification mode.
///
/// Boards normally speak plain HTTP; TLS matters only when the controller
/// sits behind a reverse proxy.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Accept any certificate (self-signed proxies).
    DangerAcceptInvalid,
}

/// Timeout and retry budget applied to every request.
///
/// The per-attempt timeout is sized so that all attempts together fit
/// into the session timeout the firmware declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub request_timeout: Duration,
}

impl RetryPolicy {
    /// Derive the policy from a server-declared session timeout:
    /// `request_timeout = session_timeout / (max_retries + 1)`.
    pub fn from_session_timeout(session_timeout: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            request_timeout: session_timeout / max_retries.saturating_add(1),
        }
    }

    /// Total number of attempts, including the first one.
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_session_timeout(DEFAULT_SESSION_TIMEOUT, 1)
    }
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            connect_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// No overall request timeout is set on the client: attempts are timed
    /// individually by the retry loop so the policy can change mid-session.
    pub fn build_client(&self) -> Result<reqwest::Client, crate::error::Error> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(concat!("duetlink/", env!("CARGO_PKG_VERSION")));

        if matches!(self.tls, TlsMode::DangerAcceptInvalid) {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map_err(|e| crate::error::Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}

// ── In-flight registry ───────────────────────────────────────────────

/// Tracks outstanding requests so they can be aborted together.
///
/// Every request takes an [`InFlightGuard`] that holds a clone of the current
/// generation's cancellation token. [`cancel_all`](Self::cancel_all) cancels
/// that generation and installs a fresh token, so requests issued afterwards
/// are unaffected.
#[derive(Debug, Default)]
pub struct InFlight {
    token: Mutex<CancellationToken>,
    count: Arc<AtomicUsize>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request. The guard deregisters it on drop.
    pub fn register(&self) -> InFlightGuard {
        let token = self
            .token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard {
            token,
            count: Arc::clone(&self.count),
        }
    }

    /// Abort every request registered so far.
    pub fn cancel_all(&self) {
        let mut token = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
    }

    /// Number of requests currently outstanding.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// RAII registration of one outstanding request.
#[derive(Debug)]
pub struct InFlightGuard {
    token: CancellationToken,
    count: Arc<AtomicUsize>,
}

impl InFlightGuard {
    /// Resolves once the request's generation has been cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_timeout_splits_session_timeout_across_attempts() {
        let policy = RetryPolicy::from_session_timeout(Duration::from_millis(8000), 1);
        assert_eq!(policy.request_timeout, Duration::from_millis(4000));
        assert_eq!(policy.attempts(), 2);

        let policy = RetryPolicy::from_session_timeout(Duration::from_millis(9000), 2);
        assert_eq!(policy.request_timeout, Duration::from_millis(3000));
    }

    #[test]
    fn guards_track_outstanding_requests() {
        let registry = InFlight::new();
        assert!(registry.is_empty());

        let first = registry.register();
        let second = registry.register();
        assert_eq!(registry.len(), 2);

        drop(first);
        assert_eq!(registry.len(), 1);
        drop(second);
        assert!(registry.is_empty());
    }

    #[test]
    fn cancel_all_only_hits_the_current_generation() {
        let registry = InFlight::new();
        let old = registry.register();

        registry.cancel_all();
        let fresh = registry.register();

        assert!(old.is_cancelled());
        assert!(!fresh.is_cancelled());
    }
}
