//! `duetlink status`: one status report.

use duetlink_core::{HeaterReadings, StatusLevel, StatusSnapshot};

use crate::cli::{GlobalOpts, StatusArgs, StatusLevelArg};
use crate::commands;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    config: duetlink_core::ControllerConfig,
    args: &StatusArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let level = match args.level {
        StatusLevelArg::Default => StatusLevel::Default,
        StatusLevelArg::Extended => StatusLevel::Extended,
        StatusLevelArg::Print => StatusLevel::Print,
    };

    let snapshot = commands::oneshot(config, |controller| async move {
        controller.fetch_status(level).await
    })
    .await?;

    let out = output::render_single(global.output, &snapshot, detail, |s| {
        s.status.code().to_string()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(s: &StatusSnapshot) -> String {
    let mut pairs: Vec<(&str, String)> = vec![
        ("Status", s.status.to_string()),
        ("Position", format_floats(&s.coords.xyz, 2)),
        (
            "Homed",
            s.coords
                .axes_homed
                .iter()
                .map(|h| if *h { "yes" } else { "no" })
                .collect::<Vec<_>>()
                .join(", "),
        ),
        (
            "Tool",
            s.current_tool.map_or_else(|| "none".into(), |t| t.to_string()),
        ),
        ("ATX power", if s.params.atx_power { "on" } else { "off" }.into()),
        ("Fans", format!("{} %", format_floats(&s.params.fan_percent, 0))),
        ("Speed factor", format!("{:.0} %", s.params.speed_factor)),
    ];

    if let Some(ref bed) = s.temps.bed {
        pairs.push(("Bed", format!("{:.1} °C → {:.1} °C ({})", bed.current, bed.active, bed.state)));
    }
    if let Some(ref chamber) = s.temps.chamber {
        pairs.push((
            "Chamber",
            format!("{:.1} °C → {:.1} °C ({})", chamber.current, chamber.active, chamber.state),
        ));
    }
    match &s.temps.heaters {
        HeaterReadings::Unified { current, .. } => {
            pairs.push(("Heaters", format!("{} °C", format_floats(current, 1))));
        }
        HeaterReadings::Legacy { heads } => {
            let current: Vec<f64> = heads.iter().map(|h| h.current).collect();
            pairs.push(("Heads", format!("{} °C", format_floats(&current, 1))));
        }
        HeaterReadings::None => {}
    }

    if let Some(ref ext) = s.extended {
        if let Some(ref name) = ext.name {
            pairs.push(("Name", name.clone()));
        }
        if let Some(ref firmware) = ext.firmware_name {
            pairs.push(("Firmware", firmware.clone()));
        }
        if let Some(ref geometry) = ext.geometry {
            pairs.push(("Geometry", geometry.clone()));
        }
    }

    if let Some(ref print) = s.print {
        pairs.push(("Printed", format!("{:.1} %", print.fraction_printed)));
        pairs.push(("Layer", print.current_layer.to_string()));
        if let Some(left) = print.times_left.file {
            pairs.push(("Time left", format_seconds(left)));
        }
    }

    if let Some(uptime) = s.uptime {
        pairs.push(("Uptime", format_seconds(uptime)));
    }

    output::detail_lines(&pairs)
}

fn format_floats(values: &[f64], precision: usize) -> String {
    if values.is_empty() {
        return "-".into();
    }
    values
        .iter()
        .map(|v| format!("{v:.precision$}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
fn format_seconds(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    let (h, m, s) = (total / 3600, total / 60 % 60, total % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else {
        format!("{m}m {s:02}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_are_split_into_units() {
        assert_eq!(format_seconds(59.6), "1m 00s");
        assert_eq!(format_seconds(3725.0), "1h 02m 05s");
        assert_eq!(format_seconds(-4.0), "0m 00s");
    }

    #[test]
    fn empty_float_list_is_a_dash() {
        assert_eq!(format_floats(&[], 1), "-");
        assert_eq!(format_floats(&[1.0, 2.26], 1), "1.0, 2.3");
    }
}
