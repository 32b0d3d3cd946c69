//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use duetlink_config::ConfigError;
use duetlink_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to board at {url}")]
    #[diagnostic(
        code(duetlink::connection_failed),
        help(
            "Check that the board is powered and reachable on the network.\n\
             Try: duetlink --host <address> status"
        )
    )]
    ConnectionFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Connection to the board was lost: {reason}")]
    #[diagnostic(
        code(duetlink::connection_lost),
        help("The board stopped answering. Increase max_retries in the profile on a flaky link.")
    )]
    ConnectionLost { reason: String },

    #[error("The board has no free HTTP session")]
    #[diagnostic(
        code(duetlink::no_free_session),
        help("Close another browser tab or client connected to this board and try again.")
    )]
    NoFreeSession,

    // ── Authentication ───────────────────────────────────────────────
    #[error("The board rejected the password")]
    #[diagnostic(
        code(duetlink::auth_failed),
        help(
            "The board password is set with M551 in config.g.\n\
             Run: duetlink config set-password --profile {profile}\n\
             Or set DUETLINK_PASSWORD."
        )
    )]
    AuthFailed { profile: String },

    // ── Board data ───────────────────────────────────────────────────
    #[error("No file information available (firmware code {code})")]
    #[diagnostic(
        code(duetlink::no_file_info),
        help("File information is only reported while a print is running.")
    )]
    FileInfoUnavailable { code: u32 },

    #[error("Board error: {message}")]
    #[diagnostic(code(duetlink::api_error))]
    ApiError { message: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(duetlink::internal))]
    Internal(String),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(duetlink::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(duetlink::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: duetlink config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No board configured")]
    #[diagnostic(
        code(duetlink::no_config),
        help(
            "Create a profile with: duetlink config init\n\
             Or pass --host (DUETLINK_HOST).\n\
             Config expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Keyring access failed: {0}")]
    #[diagnostic(
        code(duetlink::keyring),
        help("Store the password in the profile or in DUETLINK_PASSWORD instead.")
    )]
    Keyring(String),

    #[error(transparent)]
    #[diagnostic(code(duetlink::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Prompt failed: {0}")]
    #[diagnostic(
        code(duetlink::prompt),
        help("Use --yes (-y) to answer confirmations in non-interactive contexts.")
    )]
    Prompt(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON rendering failed: {0}")]
    #[diagnostic(code(duetlink::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    #[diagnostic(code(duetlink::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::ConnectionLost { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::FileInfoUnavailable { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::NoFreeSession => exit_code::CONFLICT,
            Self::Validation { .. } | Self::NoConfig { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the profile name to an authentication failure.
    pub fn with_profile(self, profile: &str) -> Self {
        match self {
            Self::AuthFailed { .. } => Self::AuthFailed {
                profile: profile.to_owned(),
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed {
                url,
                source: reason.into(),
            },

            CoreError::ConnectionLost { reason } => CliError::ConnectionLost { reason },

            CoreError::ControllerDisconnected => CliError::ConnectionLost {
                reason: "session closed".into(),
            },

            CoreError::PasswordRequired => CliError::AuthFailed {
                profile: "default".into(),
            },

            CoreError::CapacityExceeded => CliError::NoFreeSession,

            CoreError::FileInfoUnavailable { code } => CliError::FileInfoUnavailable { code },

            CoreError::Api { message, status: _ } => CliError::ApiError { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::UnknownProfile(name) => CliError::ProfileNotFound {
                name,
                available: "(run `duetlink config profiles`)".into(),
            },
            ConfigError::Keyring(e) => CliError::Keyring(e.to_string()),
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (CoreError::PasswordRequired, exit_code::AUTH),
            (CoreError::CapacityExceeded, exit_code::CONFLICT),
            (
                CoreError::ConnectionLost {
                    reason: "timeout".into(),
                },
                exit_code::CONNECTION,
            ),
            (CoreError::FileInfoUnavailable { code: 1 }, exit_code::NOT_FOUND),
            (CoreError::Internal("boom".into()), exit_code::GENERAL),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn auth_failure_names_the_profile() {
        let err = CliError::from(CoreError::PasswordRequired).with_profile("printer");
        match err {
            CliError::AuthFailed { profile } => assert_eq!(profile, "printer"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invalid_host_is_a_usage_error() {
        let err = CliError::from(ConfigError::Validation {
            field: "host".into(),
            reason: "no host".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
