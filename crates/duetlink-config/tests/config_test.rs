// Config loading tests. `figment::Jail` isolates the working directory and
// environment of each test.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use figment::Jail;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use duetlink_config::{
    Config, ConfigError, Profile, load_config_from, profile_to_controller_config, resolve_password,
    save_config_to,
};

const SAMPLE: &str = r#"
default_profile = "workshop"

[defaults]
output = "json"
timeout = 7

[profiles.workshop]
host = "192.168.1.50"
password = "plain"
update_interval_ms = 400

[profiles.workshop.reconnect]
halted = 3

[profiles.office]
host = "https://office-duet.example.org"
password_env = "OFFICE_DUET_PW"
insecure = true
"#;

#[test]
fn test_loads_profiles_from_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        let config = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;

        assert_eq!(config.default_profile.as_deref(), Some("workshop"));
        assert_eq!(config.defaults.output, "json");
        assert_eq!(config.defaults.timeout, 7);
        assert_eq!(config.profiles.len(), 2);

        let (name, profile) = config.profile(None).map_err(|e| e.to_string())?;
        assert_eq!(name, "workshop");
        assert_eq!(profile.host, "192.168.1.50");
        assert_eq!(profile.reconnect.halted, Some(3));
        Ok(())
    });
}

#[test]
fn test_env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        jail.set_env("DUETLINK_DEFAULTS__TIMEOUT", "12");
        jail.set_env("DUETLINK_DEFAULT_PROFILE", "office");

        let config = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
        assert_eq!(config.defaults.timeout, 12);
        assert_eq!(config.default_profile.as_deref(), Some("office"));
        Ok(())
    });
}

#[test]
fn test_missing_file_yields_defaults() {
    Jail::expect_with(|_jail| {
        let config = load_config_from(Path::new("absent.toml")).map_err(|e| e.to_string())?;
        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert!(config.profiles.is_empty());
        assert_eq!(config.defaults.output, "table");
        Ok(())
    });
}

#[test]
fn test_unknown_profile() {
    let config = Config::default();
    let err = config.profile(Some("garage")).unwrap_err();
    assert!(matches!(err, ConfigError::UnknownProfile(ref name) if name == "garage"));
}

#[test]
fn test_password_env_wins_over_plaintext() {
    Jail::expect_with(|jail| {
        jail.set_env("OFFICE_DUET_PW", "from-env");
        let profile = Profile {
            host: "duet.local".into(),
            password: Some("plain".into()),
            password_env: Some("OFFICE_DUET_PW".into()),
            ..Profile::default()
        };

        let password = resolve_password(&profile, "jail-env");
        assert_eq!(password.expose_secret(), "from-env");
        Ok(())
    });
}

#[test]
fn test_controller_config_from_profile() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", SAMPLE)?;
        jail.set_env("OFFICE_DUET_PW", "s3cret");
        let config = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;

        let (name, profile) = config.profile(Some("office")).map_err(|e| e.to_string())?;
        let cfg = profile_to_controller_config(profile, name, &config.defaults)
            .map_err(|e| e.to_string())?;

        assert_eq!(cfg.url.as_str(), "https://office-duet.example.org/");
        assert_eq!(cfg.password.expose_secret(), "s3cret");
        assert_eq!(cfg.tls, duetlink_core::TlsVerification::DangerAcceptInvalid);
        assert_eq!(cfg.connect_timeout, std::time::Duration::from_secs(7));
        Ok(())
    });
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.profiles.insert(
        "default".into(),
        Profile {
            host: "duet.local".into(),
            ..Profile::default()
        },
    );
    save_config_to(&config, &path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("host = \"duet.local\""));

    let loaded: Config = toml::from_str(&written).unwrap();
    assert_eq!(loaded.profiles["default"].host, "duet.local");
}
