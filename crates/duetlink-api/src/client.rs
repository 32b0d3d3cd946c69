// RepRapFirmware HTTP client
//
// Wraps `reqwest::Client` with endpoint URL construction, the retry policy
// and in-flight tracking. Endpoint methods live in `session.rs`, `status.rs`
// and `files.rs` as inherent impls to keep this module focused on transport
// mechanics.

use std::sync::{PoisonError, RwLock};

use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::transport::{InFlight, RetryPolicy, TransportConfig};

/// What the caller expects the response body to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// A JSON document. Empty or unparseable bodies are retried.
    Json,
    /// Raw text, passed through untouched (may legitimately be empty).
    Text,
}

/// A GET request against one of the `rr_*` endpoints.
#[derive(Debug, Clone)]
pub struct Request {
    path: String,
    query: Vec<(String, String)>,
    kind: BodyKind,
    retry: bool,
}

impl Request {
    pub fn json(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
            kind: BodyKind::Json,
            retry: true,
        }
    }

    pub fn text(path: impl Into<String>) -> Self {
        Self {
            kind: BodyKind::Text,
            ..Self::json(path)
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_owned(), value.into()));
        self
    }

    /// Send exactly once; failures surface as-is instead of `ConnectionLost`.
    pub fn without_retry(mut self) -> Self {
        self.retry = false;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }
}

/// A successfully received response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Json(serde_json::Value),
    Text(String),
}

/// Raw HTTP client for the controller's `rr_*` endpoints.
///
/// All requests are GETs. Each one is registered in the in-flight registry
/// for the duration of the call so [`cancel_all`](Self::cancel_all) can abort
/// it, and is retried per the current [`RetryPolicy`].
pub struct RrfClient {
    http: reqwest::Client,
    base_url: Url,
    policy: RwLock<RetryPolicy>,
    in_flight: InFlight,
}

impl RrfClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the board root, e.g. `http://192.168.1.50`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, transport.retry))
    }

    /// Create a client around a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, policy: RetryPolicy) -> Self {
        Self {
            http,
            base_url,
            policy: RwLock::new(policy),
            in_flight: InFlight::new(),
        }
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The retry policy applied to new requests.
    pub fn retry_policy(&self) -> RetryPolicy {
        *self.policy.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the retry policy (e.g. after the session timeout is known).
    pub fn set_retry_policy(&self, policy: RetryPolicy) {
        debug!(
            max_retries = policy.max_retries,
            timeout_ms = millis(policy.request_timeout),
            "updating retry policy"
        );
        *self.policy.write().unwrap_or_else(PoisonError::into_inner) = policy;
    }

    /// Number of requests currently outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Abort every outstanding request. Aborted calls return [`Error::Aborted`].
    pub fn cancel_all(&self) {
        debug!(outstanding = self.in_flight.len(), "cancelling in-flight requests");
        self.in_flight.cancel_all();
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build the full URL for an endpoint path: `{base}/{path}`.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a request and return the body in the shape it declared.
    pub async fn send(&self, request: &Request) -> Result<Response, Error> {
        match request.kind {
            BodyKind::Json => self
                .execute(request, decode_json::<serde_json::Value>)
                .await
                .map(Response::Json),
            BodyKind::Text => self
                .execute(request, |body| Ok(body))
                .await
                .map(Response::Text),
        }
    }

    /// Send a JSON request and decode the body into `T`.
    ///
    /// Decoding happens inside the retry loop: a body that does not match
    /// `T` counts as malformed and is retried like a timeout.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, request: &Request) -> Result<T, Error> {
        self.execute(request, decode_json::<T>).await
    }

    /// Send a text request.
    pub(crate) async fn get_text(&self, request: &Request) -> Result<String, Error> {
        self.execute(request, |body| Ok(body)).await
    }

    /// The retry loop shared by every request.
    async fn execute<T>(
        &self,
        request: &Request,
        decode: impl Fn(String) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let guard = self.in_flight.register();
        let policy = self.retry_policy();
        let attempts = if request.retry { policy.attempts() } else { 1 };
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            let outcome = tokio::select! {
                biased;
                () = guard.cancelled() => {
                    trace!(path = %request.path, "request aborted");
                    return Err(Error::Aborted);
                }
                outcome = tokio::time::timeout(policy.request_timeout, self.attempt(request)) => outcome,
            };

            let err = match outcome {
                Ok(Ok(body)) => match decode(body) {
                    Ok(value) => return Ok(value),
                    Err(e) => e,
                },
                Ok(Err(e)) => e,
                Err(_elapsed) => Error::Timeout {
                    timeout_ms: millis(policy.request_timeout),
                },
            };

            if !request.retry || !err.is_retryable() {
                return Err(err);
            }

            warn!(
                path = %request.path,
                attempt,
                attempts,
                error = %err,
                "request failed, retrying"
            );
            if let Error::MalformedPayload { ref body, .. } = err {
                debug!(body = %preview(body), "unparseable response body");
            }
            last_failure = err.to_string();
        }

        Err(Error::ConnectionLost {
            attempts,
            reason: last_failure,
        })
    }

    /// One round trip, returning the raw body text.
    async fn attempt(&self, request: &Request) -> Result<String, Error> {
        let url = self.endpoint_url(&request.path)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).query(&request.query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                body: preview(&body).to_owned(),
            });
        }

        Ok(resp.text().await?)
    }
}

fn decode_json<T: DeserializeOwned>(body: String) -> Result<T, Error> {
    if body.trim().is_empty() {
        return Err(Error::MalformedPayload {
            message: "empty response body".into(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| Error::MalformedPayload {
        message: e.to_string(),
        body,
    })
}

fn preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> RrfClient {
        RrfClient::with_client(
            reqwest::Client::new(),
            Url::parse(base).expect("valid URL"),
            RetryPolicy::default(),
        )
    }

    #[test]
    fn endpoint_url_handles_trailing_slash() {
        let url = client("http://printer.local/")
            .endpoint_url("rr_status")
            .expect("valid URL");
        assert_eq!(url.as_str(), "http://printer.local/rr_status");
    }

    #[test]
    fn endpoint_url_keeps_sub_path() {
        let url = client("http://proxy.local/duet")
            .endpoint_url("rr_reply")
            .expect("valid URL");
        assert_eq!(url.as_str(), "http://proxy.local/duet/rr_reply");
    }

    #[test]
    fn empty_json_body_is_malformed() {
        let result = decode_json::<serde_json::Value>("  \n".into());
        assert!(matches!(result, Err(Error::MalformedPayload { .. })));
    }

    #[test]
    fn preview_is_char_boundary_safe() {
        let body = "°".repeat(300);
        assert_eq!(preview(&body).chars().count(), 200);
    }
}
