// ── Runtime connection configuration ──
//
// Describes *how* to talk to a controller: where it lives, the session
// password and all timing knobs of the polling and recovery machinery.
// Never touches disk. The CLI (or any other host) builds a
// `ControllerConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Password RepRapFirmware accepts when none has been configured with M551.
pub const DEFAULT_PASSWORD: &str = "reprap";

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Skip verification (self-signed reverse proxies).
    DangerAcceptInvalid,
}

/// Configuration for a [`Controller`](crate::Controller).
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Board root URL (e.g., `http://192.168.1.50`).
    pub url: Url,
    /// Session password. Replaced by the last one that connected successfully.
    pub password: SecretString,
    pub tls: TlsVerification,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// How often a timed-out or garbled request is resent before the
    /// session is declared lost.
    pub max_retries: u32,
    /// Pause between two status polls.
    pub update_interval: Duration,
    /// Every this many polls an extended status is requested.
    pub extended_status_interval: u32,
    /// Wait after an emergency stop before reconnecting.
    pub halted_reconnect_delay: Duration,
    /// Wait after a main firmware upload before reconnecting.
    pub firmware_reconnect_delay: Duration,
    /// Wait after a WiFi server upload before reconnecting.
    pub wifi_server_reconnect_delay: Duration,
    /// Wait after a web interface upload before reconnecting.
    pub web_control_reconnect_delay: Duration,
    /// Pause between `rr_fileinfo` calls while the firmware is still parsing.
    pub file_info_retry_delay: Duration,
    /// Upper-case G-code before sending it.
    pub uppercase_gcode: bool,
    /// Report empty replies to sent G-code as successes.
    pub log_success: bool,
    /// Start the status poller after connecting. Off for one-shot use.
    pub polling: bool,
}

impl ControllerConfig {
    /// Config for `url` with the firmware's stock timings.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            password: SecretString::from(DEFAULT_PASSWORD),
            tls: TlsVerification::default(),
            connect_timeout: Duration::from_secs(5),
            max_retries: 1,
            update_interval: Duration::from_millis(250),
            extended_status_interval: 10,
            halted_reconnect_delay: Duration::from_secs(5),
            firmware_reconnect_delay: Duration::from_secs(20),
            wifi_server_reconnect_delay: Duration::from_secs(45),
            web_control_reconnect_delay: Duration::from_secs(30),
            file_info_retry_delay: Duration::from_millis(250),
            uppercase_gcode: false,
            log_success: false,
            polling: true,
        }
    }
}
