// Command, file and configuration endpoints

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::client::{Request, RrfClient};
use crate::error::Error;
use crate::models::{FileInfoResponse, OemFeatures};

/// Location of the vendor feature file on the SD card.
pub const OEM_FEATURES_PATH: &str = "0:/sys/oem.json";

impl RrfClient {
    /// Queue a line of G-code.
    ///
    /// `GET /rr_gcode?gcode={text}`. The acknowledgement body only reports
    /// the free buffer space and is not used.
    pub async fn gcode(&self, text: &str) -> Result<(), Error> {
        debug!(gcode = text, "sending G-code");
        let request = Request::text("rr_gcode").query("gcode", text);
        self.get_text(&request).await.map(drop)
    }

    /// Information about the file currently being printed.
    ///
    /// `GET /rr_fileinfo`. `err == 2` means the firmware has not finished
    /// parsing the file yet and the caller should ask again later.
    pub async fn file_info(&self) -> Result<FileInfoResponse, Error> {
        debug!("fetching file info");
        self.get_json(&Request::json("rr_fileinfo")).await
    }

    /// Machine configuration.
    ///
    /// `GET /rr_config`. Loosely typed; the key set depends on the firmware.
    pub async fn config(&self) -> Result<serde_json::Value, Error> {
        debug!("fetching machine configuration");
        self.get_json(&Request::json("rr_config")).await
    }

    /// Download a JSON file from the controller's storage.
    ///
    /// `GET /rr_download?name={name}`. Sent once; a missing file is an
    /// ordinary `Error::Http` with status 404.
    pub async fn download_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, Error> {
        let request = Request::json("rr_download").query("name", name).without_retry();
        self.get_json(&request).await
    }

    /// Vendor customisation file, if the board has one.
    pub async fn oem_features(&self) -> Result<OemFeatures, Error> {
        debug!("probing OEM features");
        self.download_json(OEM_FEATURES_PATH).await
    }
}
