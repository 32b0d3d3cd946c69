//! `duetlink machine-config`: the board's `rr_config` report.

use serde_json::Value;

use duetlink_core::ControllerConfig;

use crate::cli::GlobalOpts;
use crate::commands;
use crate::error::CliError;
use crate::output;

pub async fn handle(config: ControllerConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let machine = commands::oneshot(config, |controller| async move {
        controller.machine_config().await
    })
    .await?;

    let out = output::render_single(global.output, &machine, detail, |v| flatten(v).join("\n"))?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let pairs: Vec<(&str, String)> = map
                .iter()
                .map(|(k, v)| (k.as_str(), scalar(v)))
                .collect();
            output::detail_lines(&pairs)
        }
        other => scalar(other),
    }
}

/// `key=value` lines for scripting.
fn flatten(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map.iter().map(|(k, v)| format!("{k}={}", scalar(v))).collect(),
        other => vec![scalar(other)],
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn arrays_are_joined_and_strings_unquoted() {
        let value = json!({ "firmwareName": "RepRapFirmware", "axisMins": [0, 0, 0] });
        assert_eq!(
            flatten(&value),
            vec!["axisMins=0, 0, 0".to_owned(), "firmwareName=RepRapFirmware".to_owned()]
        );
    }
}
