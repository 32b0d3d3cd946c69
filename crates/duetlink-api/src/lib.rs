// duetlink-api: Async Rust client for the RepRapFirmware rr_* HTTP endpoints

pub mod client;
pub mod error;
pub mod files;
pub mod models;
pub mod session;
pub mod status;
pub mod transport;

pub use client::{BodyKind, Request, Response, RrfClient};
pub use error::Error;
pub use files::OEM_FEATURES_PATH;
pub use models::{ConnectResponse, FileInfoResponse, OemFeatures, StatusLevel, StatusResponse};
pub use transport::{
    DEFAULT_SESSION_TIMEOUT, InFlight, InFlightGuard, RetryPolicy, TlsMode, TransportConfig,
};
