// ── Core error types ──
//
// User-facing errors from duetlink-core. Consumers never see raw HTTP
// status codes or JSON parse failures. The `From<duetlink_api::Error>`
// impl translates transport-layer errors into these variants.
//
// Halted and Updating firmware states are not errors: they drive the
// recovery flow and surface as events.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to controller at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Connection to controller lost: {reason}")]
    ConnectionLost { reason: String },

    #[error("Controller rejected the password")]
    PasswordRequired,

    #[error("Controller has no free HTTP sessions")]
    CapacityExceeded,

    #[error("Controller disconnected")]
    ControllerDisconnected,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("File info unavailable (firmware code {code})")]
    FileInfoUnavailable { code: u32 },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<duetlink_api::Error> for CoreError {
    fn from(err: duetlink_api::Error) -> Self {
        match err {
            duetlink_api::Error::Transport(ref e) => {
                if e.is_connect() || e.is_timeout() {
                    CoreError::ConnectionFailed {
                        url: e.url().map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            duetlink_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            duetlink_api::Error::Timeout { timeout_ms } => CoreError::ConnectionLost {
                reason: format!("request timed out after {timeout_ms}ms"),
            },
            duetlink_api::Error::ConnectionLost { attempts, reason } => CoreError::ConnectionLost {
                reason: format!("{reason} (after {attempts} attempts)"),
            },
            duetlink_api::Error::Aborted => CoreError::ControllerDisconnected,
            duetlink_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            duetlink_api::Error::Http { status, body } => CoreError::Api {
                message: if body.is_empty() {
                    format!("HTTP {status}")
                } else {
                    body
                },
                status: Some(status),
            },
            duetlink_api::Error::MalformedPayload { message, body: _ } => {
                CoreError::Internal(format!("Malformed response: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CoreError;

    #[test]
    fn retry_exhaustion_maps_to_connection_lost() {
        let err = CoreError::from(duetlink_api::Error::ConnectionLost {
            attempts: 2,
            reason: "Request timed out after 4000ms".into(),
        });
        assert!(matches!(err, CoreError::ConnectionLost { .. }));
        assert!(err.to_string().contains("after 2 attempts"));
    }

    #[test]
    fn http_status_is_preserved() {
        let err = CoreError::from(duetlink_api::Error::Http {
            status: 404,
            body: String::new(),
        });
        match err {
            CoreError::Api { status, message } => {
                assert_eq!(status, Some(404));
                assert_eq!(message, "HTTP 404");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
