use thiserror::Error;

/// Top-level error type for the `duetlink-api` crate.
///
/// Distinguishes the failure modes the session layer reacts to differently:
/// retryable transport hiccups, deliberate cancellation, and errors that
/// should tear the session down. `duetlink-core` maps these into user-facing
/// variants.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A single attempt exceeded the per-request timeout.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The request was cancelled through the in-flight registry.
    #[error("Request aborted")]
    Aborted,

    /// Every retry of a request failed. Raised once the retry budget is spent.
    #[error("Connection lost after {attempts} attempt(s): {reason}")]
    ConnectionLost { attempts: u32, reason: String },

    /// TLS setup failure while building the HTTP client.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// The controller answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Empty or unparseable JSON body. Treated like a timeout for retries,
    /// since some firmware builds occasionally send truncated responses.
    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String, body: String },
}

impl Error {
    /// Returns `true` if the request was cancelled on purpose.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Returns `true` if resending the identical request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } | Self::MalformedPayload { .. } => true,
            _ => false,
        }
    }

    /// Returns `true` if this is an HTTP 404.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Http { status: 404, .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn malformed_and_timeout_are_retryable() {
        assert!(Error::Timeout { timeout_ms: 10 }.is_retryable());
        assert!(
            Error::MalformedPayload {
                message: "empty body".into(),
                body: String::new(),
            }
            .is_retryable()
        );
    }

    #[test]
    fn aborted_is_never_retried() {
        let err = Error::Aborted;
        assert!(err.is_aborted());
        assert!(!err.is_retryable());
    }

    #[test]
    fn http_errors_are_final() {
        let err = Error::Http {
            status: 404,
            body: String::new(),
        };
        assert!(!err.is_retryable());
        assert!(err.is_not_found());
    }
}
