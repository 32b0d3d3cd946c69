//! Profile resolution: config file + CLI flags → `ControllerConfig`.

use std::time::Duration;

use secrecy::SecretString;

use duetlink_config::{self as config, Config, Profile};
use duetlink_core::{ControllerConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Name used when the board comes from `--host` alone.
const AD_HOC_PROFILE: &str = "default";

/// Profile name in effect: `--profile`, then the config's default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| AD_HOC_PROFILE.into())
}

/// Build the controller configuration for this invocation.
///
/// Returns the profile name alongside so errors can point at it.
pub fn resolve(global: &GlobalOpts, cfg: &Config) -> Result<(String, ControllerConfig), CliError> {
    let name = active_profile_name(global, cfg);

    let mut controller_config = if let Some(profile) = cfg.profiles.get(&name) {
        let mut profile_config = config::profile_to_controller_config(profile, &name, &cfg.defaults)?;
        if let Some(ref host) = global.host {
            profile_config.url = config::parse_host(host)?;
        }
        profile_config
    } else if let Some(ref host) = global.host {
        let profile = Profile {
            host: host.clone(),
            ..Profile::default()
        };
        config::profile_to_controller_config(&profile, &name, &cfg.defaults)?
    } else if global.profile.is_some() {
        let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
        available.sort_unstable();
        return Err(CliError::ProfileNotFound {
            name,
            available: if available.is_empty() {
                "(none)".into()
            } else {
                available.join(", ")
            },
        });
    } else {
        return Err(CliError::NoConfig {
            path: config::config_path().display().to_string(),
        });
    };

    apply_overrides(&mut controller_config, global);
    Ok((name, controller_config))
}

fn apply_overrides(controller_config: &mut ControllerConfig, global: &GlobalOpts) {
    if let Some(ref password) = global.password {
        controller_config.password = SecretString::from(password.clone());
    }
    if global.insecure {
        controller_config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        controller_config.connect_timeout = Duration::from_secs(secs);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use secrecy::ExposeSecret;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["duetlink"];
        argv.extend_from_slice(args);
        argv.push("file-info");
        Cli::try_parse_from(argv).expect("valid arguments").global
    }

    fn with_profile(name: &str, host: &str) -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            name.into(),
            Profile {
                host: host.into(),
                password: Some("secret".into()),
                ..Profile::default()
            },
        );
        cfg.default_profile = Some(name.into());
        cfg
    }

    #[test]
    fn host_flag_works_without_profile() {
        let (name, cc) =
            resolve(&global(&["--host", "10.0.0.5", "--password", "pw"]), &Config::default())
                .expect("resolves");
        assert_eq!(name, "default");
        assert_eq!(cc.url.as_str(), "http://10.0.0.5/");
        assert_eq!(cc.password.expose_secret(), "pw");
    }

    #[test]
    fn flags_override_profile() {
        let cfg = with_profile("printer", "duet.local");
        let (name, cc) = resolve(&global(&["-k", "--timeout", "9"]), &cfg).expect("resolves");
        assert_eq!(name, "printer");
        assert_eq!(cc.url.host_str(), Some("duet.local"));
        assert_eq!(cc.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(cc.connect_timeout, Duration::from_secs(9));
    }

    #[test]
    fn missing_profile_lists_available() {
        let cfg = with_profile("printer", "duet.local");
        let err = resolve(&global(&["-p", "other"]), &cfg).expect_err("unknown profile");
        match err {
            CliError::ProfileNotFound { name, available } => {
                assert_eq!(name, "other");
                assert_eq!(available, "printer");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn nothing_configured_is_no_config() {
        let err = resolve(&global(&[]), &Config::default()).expect_err("no board");
        assert!(matches!(err, CliError::NoConfig { .. }));
    }
}
