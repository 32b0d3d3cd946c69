// Status and console endpoints

use tracing::debug;

use crate::client::{Request, RrfClient};
use crate::error::Error;
use crate::models::{StatusLevel, StatusResponse};

impl RrfClient {
    /// Poll the machine status at the given verbosity.
    ///
    /// `GET /rr_status?type={1|2|3}`
    pub async fn status(&self, level: StatusLevel) -> Result<StatusResponse, Error> {
        let request = Request::json("rr_status").query("type", level.as_query());
        self.get_json(&request).await
    }

    /// Fetch the pending console reply.
    ///
    /// `GET /rr_reply`. Returns plain text, possibly empty.
    pub async fn reply(&self) -> Result<String, Error> {
        debug!("fetching console reply");
        self.get_text(&Request::text("rr_reply")).await
    }
}
