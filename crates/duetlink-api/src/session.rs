// Session endpoints
//
// rr_connect / rr_disconnect. Neither is retried: a failed connect is
// reported straight back to the caller, and disconnect is best-effort.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::{Request, RrfClient};
use crate::error::Error;
use crate::models::ConnectResponse;

impl RrfClient {
    /// Open a session.
    ///
    /// `GET /rr_connect?password={password}&time={time}`
    ///
    /// `time` is the client's local wall-clock time, which the firmware
    /// uses to set its own clock.
    pub async fn connect(&self, password: &SecretString, time: &str) -> Result<ConnectResponse, Error> {
        debug!(time, "opening session");
        let request = Request::json("rr_connect")
            .query("password", password.expose_secret())
            .query("time", time)
            .without_retry();
        self.get_json(&request).await
    }

    /// Close the session.
    ///
    /// `GET /rr_disconnect`. The body is ignored.
    pub async fn disconnect(&self) -> Result<(), Error> {
        debug!("closing session");
        let request = Request::text("rr_disconnect").without_retry();
        self.get_text(&request).await.map(drop)
    }
}
