//! Shared configuration for the duetlink CLI.
//!
//! TOML profiles, password resolution (env + keyring + plaintext), and
//! translation to `duetlink_core::ControllerConfig`. The CLI adds
//! `GlobalOpts`-aware overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use duetlink_core::{ControllerConfig, DEFAULT_PASSWORD, TlsVerification};

/// Keyring service name.
const KEYRING_SERVICE: &str = "duetlink";

/// Environment variable consulted for the board password.
pub const PASSWORD_ENV: &str = "DUETLINK_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{0}' not found")]
    UnknownProfile(String),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named board profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownProfile(name.into()))
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// TCP connect timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Upper-case G-code before sending it.
    #[serde(default)]
    pub uppercase_gcode: bool,

    /// Show "ok" for G-code that produced no reply.
    #[serde(default)]
    pub log_success: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            uppercase_gcode: false,
            log_success: false,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    5
}

/// A named board profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Board address: a bare host (`192.168.1.50`, `duet.local`) or a URL.
    pub host: String,

    /// Board password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Override insecure TLS setting (boards behind a TLS proxy).
    pub insecure: Option<bool>,

    /// Override connect timeout, seconds.
    pub timeout: Option<u64>,

    /// Retries per request before the session counts as lost.
    pub max_retries: Option<u32>,

    /// Status poll interval, milliseconds.
    pub update_interval_ms: Option<u64>,

    /// Polls between two extended status requests.
    pub extended_status_interval: Option<u32>,

    /// Reconnect delays, seconds.
    #[serde(default)]
    pub reconnect: ReconnectDelays,

    pub uppercase_gcode: Option<bool>,
    pub log_success: Option<bool>,
}

/// Per-profile overrides of the recovery delays.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct ReconnectDelays {
    pub halted: Option<u64>,
    pub firmware: Option<u64>,
    pub wifi_server: Option<u64>,
    pub web_control: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "duetlink", "duetlink").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("duetlink");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path`, overlaid with `DUETLINK_*` variables.
///
/// Nested keys use a double underscore: `DUETLINK_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("DUETLINK_").ignore(&["PASSWORD"]).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Password resolution ─────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/password"))
}

/// Resolve the board password.
///
/// Order: the profile's `password_env` variable, `DUETLINK_PASSWORD`, the
/// system keyring, the plaintext `password` field. Boards without an M551
/// password accept the firmware default, which is the fallback.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> SecretString {
    // 1. Profile's password_env → env var lookup
    if let Some(ref env_name) = profile.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return SecretString::from(val);
        }
    }

    // 2. Global env var
    if let Ok(val) = std::env::var(PASSWORD_ENV) {
        return SecretString::from(val);
    }

    // 3. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return SecretString::from(secret);
        }
    }

    // 4. Plaintext in config
    if let Some(ref pw) = profile.password {
        return SecretString::from(pw.clone());
    }

    SecretString::from(DEFAULT_PASSWORD)
}

/// Store a profile's password in the system keyring.
pub fn store_password(profile_name: &str, password: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(password.expose_secret())?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Parse a profile host into a board URL. Bare hosts get `http://`.
pub fn parse_host(host: &str) -> Result<url::Url, ConfigError> {
    let host = host.trim();
    let candidate = if host.contains("://") {
        host.to_owned()
    } else {
        format!("http://{host}")
    };
    let url: url::Url = candidate.parse().map_err(|_| ConfigError::Validation {
        field: "host".into(),
        reason: format!("invalid address: {host}"),
    })?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::Validation {
            field: "host".into(),
            reason: format!("no host in {host}"),
        });
    }
    Ok(url)
}

/// Build a `ControllerConfig` from a profile, with no CLI flag overrides.
pub fn profile_to_controller_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let url = parse_host(&profile.host)?;
    let mut config = ControllerConfig::new(url);

    config.password = resolve_password(profile, profile_name);
    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else {
        TlsVerification::SystemDefaults
    };
    config.connect_timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.uppercase_gcode = profile.uppercase_gcode.unwrap_or(defaults.uppercase_gcode);
    config.log_success = profile.log_success.unwrap_or(defaults.log_success);

    if let Some(retries) = profile.max_retries {
        config.max_retries = retries;
    }
    if let Some(ms) = profile.update_interval_ms {
        if ms == 0 {
            return Err(ConfigError::Validation {
                field: "update_interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        config.update_interval = Duration::from_millis(ms);
    }
    if let Some(interval) = profile.extended_status_interval {
        config.extended_status_interval = interval;
    }

    let delays = &profile.reconnect;
    if let Some(secs) = delays.halted {
        config.halted_reconnect_delay = Duration::from_secs(secs);
    }
    if let Some(secs) = delays.firmware {
        config.firmware_reconnect_delay = Duration::from_secs(secs);
    }
    if let Some(secs) = delays.wifi_server {
        config.wifi_server_reconnect_delay = Duration::from_secs(secs);
    }
    if let Some(secs) = delays.web_control {
        config.web_control_reconnect_delay = Duration::from_secs(secs);
    }

    Ok(config)
}
