//! Config subcommand handlers.

use dialoguer::{Confirm, Input, Select};
use secrecy::SecretString;
use serde::Serialize;
use tabled::Tabled;

use duetlink_config::{self as config, Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Prompt(e.to_string())
}

fn profile_not_found(cfg: &Config, name: String) -> CliError {
    let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
    available.sort_unstable();
    CliError::ProfileNotFound {
        name,
        available: if available.is_empty() {
            "(none)".into()
        } else {
            available.join(", ")
        },
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, expected: &str) -> Result<T, CliError> {
    value.parse().map_err(|_| CliError::Validation {
        field: key.into(),
        reason: format!("must be {expected}"),
    })
}

#[derive(Serialize, Tabled)]
struct ProfileRow {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Default")]
    default: String,
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("<unrenderable: {e}>")),
                |_| config::config_path().display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: duetlink config init");
                return Ok(());
            }
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            let mut rows: Vec<ProfileRow> = cfg
                .profiles
                .iter()
                .map(|(name, profile)| ProfileRow {
                    name: name.clone(),
                    host: profile.host.clone(),
                    default: if name == default { "*".into() } else { String::new() },
                })
                .collect();
            rows.sort_by(|a, b| a.name.cmp(&b.name));
            let out = output::render_list(
                global.output,
                &rows,
                |r| ProfileRow {
                    name: r.name.clone(),
                    host: r.host.clone(),
                    default: r.default.clone(),
                },
                |r| r.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Set { key, value } => {
            let mut cfg = config::load_config_or_default();
            let profile_name = active_profile_name(global, &cfg);
            let profile = cfg.profiles.entry(profile_name.clone()).or_default();
            set_key(profile, &key, value)?;
            config::save_config(&cfg)?;
            eprintln!("✓ Set {key} on profile '{profile_name}'");
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                return Err(profile_not_found(&cfg, name));
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("✓ Default profile set to '{name}'");
            Ok(())
        }

        ConfigCommand::SetPassword => {
            let cfg = config::load_config_or_default();
            let profile_name = active_profile_name(global, &cfg);
            if !cfg.profiles.contains_key(&profile_name) {
                return Err(profile_not_found(&cfg, profile_name));
            }
            let password = rpassword::prompt_password("Board password: ").map_err(prompt_err)?;
            config::store_password(&profile_name, &SecretString::from(password))?;
            eprintln!("✓ Password for '{profile_name}' stored in system keyring");
            Ok(())
        }
    }
}

fn set_key(profile: &mut Profile, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "host" => {
            config::parse_host(&value)?;
            profile.host = value;
        }
        "password_env" | "password-env" => profile.password_env = Some(value),
        "insecure" => profile.insecure = Some(parse_value(key, &value, "'true' or 'false'")?),
        "timeout" => profile.timeout = Some(parse_value(key, &value, "a number (seconds)")?),
        "max_retries" | "max-retries" => {
            profile.max_retries = Some(parse_value(key, &value, "a whole number")?);
        }
        "update_interval_ms" | "update-interval-ms" => {
            let ms: u64 = parse_value(key, &value, "a number (milliseconds)")?;
            if ms == 0 {
                return Err(CliError::Validation {
                    field: key.into(),
                    reason: "must be greater than zero".into(),
                });
            }
            profile.update_interval_ms = Some(ms);
        }
        "uppercase_gcode" | "uppercase-gcode" => {
            profile.uppercase_gcode = Some(parse_value(key, &value, "'true' or 'false'")?);
        }
        "log_success" | "log-success" => {
            profile.log_success = Some(parse_value(key, &value, "'true' or 'false'")?);
        }
        other => {
            return Err(CliError::Validation {
                field: other.into(),
                reason: format!(
                    "unknown config key '{other}'. Valid keys: host, password_env, insecure, \
                     timeout, max_retries, update_interval_ms, uppercase_gcode, log_success"
                ),
            });
        }
    }
    Ok(())
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("duetlink configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    let mut cfg = config::load_config_or_default();

    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    let host: String = Input::new()
        .with_prompt("Board address (host name, IP or URL)")
        .interact_text()
        .map_err(prompt_err)?;
    config::parse_host(&host)?;

    let mut profile = Profile {
        host,
        ..Profile::default()
    };

    let has_password = Confirm::new()
        .with_prompt("Does the board have a password (M551)?")
        .default(false)
        .interact()
        .map_err(prompt_err)?;

    if has_password {
        let password = rpassword::prompt_password("Board password: ").map_err(prompt_err)?;
        let store_choices = &[
            "Store in system keyring (recommended)",
            "Save to config file (plaintext)",
        ];
        let store_selection = Select::new()
            .with_prompt("Where to store the password?")
            .items(store_choices)
            .default(0)
            .interact()
            .map_err(prompt_err)?;
        if store_selection == 0 {
            config::store_password(&profile_name, &SecretString::from(password))?;
            eprintln!("   ✓ Password stored in system keyring");
        } else {
            profile.password = Some(password);
        }
    }

    cfg.profiles.insert(profile_name.clone(), profile);
    if cfg.profiles.len() == 1 || cfg.default_profile.is_none() {
        cfg.default_profile = Some(profile_name.clone());
    }
    config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", config_path.display());
    eprintln!("  Profile: {profile_name}");
    eprintln!("\n  Test it: duetlink -p {profile_name} status");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_key_validates_values() {
        let mut profile = Profile::default();
        set_key(&mut profile, "timeout", "9".into()).expect("valid timeout");
        assert_eq!(profile.timeout, Some(9));

        set_key(&mut profile, "uppercase-gcode", "true".into()).expect("valid bool");
        assert_eq!(profile.uppercase_gcode, Some(true));

        assert!(set_key(&mut profile, "update_interval_ms", "0".into()).is_err());
        assert!(set_key(&mut profile, "insecure", "maybe".into()).is_err());
        assert!(set_key(&mut profile, "colour", "red".into()).is_err());
    }

    #[test]
    fn set_host_rejects_empty_address() {
        let mut profile = Profile::default();
        assert!(set_key(&mut profile, "host", "http://".into()).is_err());
        set_key(&mut profile, "host", "duet.local".into()).expect("bare host");
        assert_eq!(profile.host, "duet.local");
    }
}
