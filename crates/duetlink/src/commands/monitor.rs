//! `duetlink monitor`: a long-lived session streaming board events.
//!
//! Renders each `ControllerEvent` as a line of text (or one serialized
//! document per event for the structured output formats) and answers
//! confirmation requests on the terminal.

use std::sync::Arc;
use std::time::Duration;

use owo_colors::OwoColorize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use duetlink_core::{
    ConfirmationKind, ConsoleEntry, ConsoleStyle, Controller, ControllerConfig, ControllerEvent,
    TemperatureSample,
};

use crate::cli::{GlobalOpts, MonitorArgs, OutputFormat};
use crate::commands;
use crate::error::CliError;
use crate::output;

pub async fn handle(
    mut config: ControllerConfig,
    args: MonitorArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Some(ms) = args.interval {
        if ms == 0 {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be greater than zero".into(),
            });
        }
        config.update_interval = Duration::from_millis(ms);
    }
    let fans = parse_fan_overrides(&args.fans)?;
    config.polling = true;

    let controller = Controller::new(config)?;
    for (fan, value) in fans {
        controller.set_fan_override(fan, Some(value)).await;
    }

    // Subscribe first so ConnectionEstablished is not missed.
    let mut events = controller.events();
    commands::connect(&controller).await?;

    let color = output::should_color(global.color);
    let deadline = args
        .duration
        .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));

    let result = loop {
        let expired = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                break Ok(());
            }
            () = expired => break Ok(()),
            received = events.recv() => match received {
                Ok(event) => {
                    if let Err(e) = on_event(&controller, &event, &args, global, color).await {
                        break Err(e);
                    }
                }
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "monitor fell behind, events dropped"),
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    controller.disconnect(true).await;
    result
}

async fn on_event(
    controller: &Controller,
    event: &Arc<ControllerEvent>,
    args: &MonitorArgs,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    emit(event, args.all, global, color)?;

    match &**event {
        ControllerEvent::ConfirmationRequested { kind } => {
            let accepted = commands::confirm(confirmation_prompt(*kind).into(), global.yes).await?;
            controller.respond_to_confirmation(*kind, accepted).await?;
        }
        ControllerEvent::ConnectionLost { reason } => {
            return Err(CliError::ConnectionLost {
                reason: reason.clone(),
            });
        }
        _ => {}
    }
    Ok(())
}

fn emit(event: &ControllerEvent, all: bool, global: &GlobalOpts, color: bool) -> Result<(), CliError> {
    if !all && is_per_poll(event) {
        return Ok(());
    }
    let rendered = match global.output {
        OutputFormat::Json => output::render_json(event, false)?,
        OutputFormat::JsonCompact => output::render_json(event, true)?,
        OutputFormat::Yaml => format!("---\n{}", serde_yaml::to_string(event)?),
        OutputFormat::Table | OutputFormat::Plain => {
            let Some(text) = describe(event, color) else {
                return Ok(());
            };
            if global.output == OutputFormat::Plain {
                text
            } else {
                let stamp = chrono::Local::now().format("%H:%M:%S").to_string();
                if color {
                    format!("{} {text}", stamp.dimmed())
                } else {
                    format!("{stamp} {text}")
                }
            }
        }
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}

/// Events produced on (almost) every poll; hidden unless `--all`.
fn is_per_poll(event: &ControllerEvent) -> bool {
    matches!(
        event,
        ControllerEvent::SnapshotUpdated { .. }
            | ControllerEvent::Temperatures { .. }
            | ControllerEvent::FansUpdated { .. }
            | ControllerEvent::HeatersInUseChanged { .. }
            | ControllerEvent::LayerHistory { .. }
            | ControllerEvent::FilamentListRequested
            | ControllerEvent::BedPointsCleared
    )
}

fn confirmation_prompt(kind: ConfirmationKind) -> &'static str {
    match kind {
        ConfirmationKind::FirmwareReset => "The board is still halted. Reset it with M999?",
        ConfirmationKind::ReloadPage => "The web interface was updated. Acknowledge and continue?",
    }
}

// ── Text rendering ───────────────────────────────────────────────────

/// Color a console reply by its style.
pub fn paint_console(message: &str, style: ConsoleStyle, color: bool) -> String {
    if !color {
        return message.to_owned();
    }
    match style {
        ConsoleStyle::Error => message.red().to_string(),
        ConsoleStyle::Warning => message.yellow().to_string(),
        ConsoleStyle::Success => message.green().to_string(),
        ConsoleStyle::Info => message.to_owned(),
    }
}

fn console_line(entry: &ConsoleEntry, color: bool) -> String {
    let message = paint_console(&entry.message, entry.style, color);
    match entry.gcode {
        Some(ref gcode) if color => format!("{} {message}", format!("{gcode}:").bold()),
        Some(ref gcode) => format!("{gcode}: {message}"),
        None => message,
    }
}

fn notice(text: String, style: ConsoleStyle, color: bool) -> String {
    paint_console(&text, style, color)
}

/// One line of text for an event, `None` for events with nothing to show.
#[allow(clippy::too_many_lines)]
fn describe(event: &ControllerEvent, color: bool) -> Option<String> {
    use ConsoleStyle::{Error, Info, Success, Warning};

    let line = match event {
        ControllerEvent::ConnectionEstablished { board_type } => notice(
            match board_type {
                Some(board) => format!("connected ({board})"),
                None => "connected".into(),
            },
            Success,
            color,
        ),
        ControllerEvent::ConnectionLost { reason } => {
            notice(format!("connection lost: {reason}"), Error, color)
        }
        ControllerEvent::PasswordRequired => {
            notice("board rejected the password".into(), Error, color)
        }
        ControllerEvent::SessionCapacityExceeded => {
            notice("board has no free session".into(), Error, color)
        }
        ControllerEvent::FilamentListRequested | ControllerEvent::BedPointsCleared => return None,
        ControllerEvent::SnapshotUpdated { snapshot, .. } => {
            format!("status {} z={:.2}", snapshot.status, snapshot.z())
        }
        ControllerEvent::MachineInfoUpdated { info } => format!(
            "machine {} running {}",
            info.name.as_deref().unwrap_or("(unnamed)"),
            info.firmware_name.as_deref().unwrap_or("unknown firmware"),
        ),
        ControllerEvent::PrintStarted => notice("print started".into(), Success, color),
        ControllerEvent::PrintStatusChanged { printing, paused } => match (*printing, *paused) {
            (_, true) => notice("print paused".into(), Warning, color),
            (true, false) => "printing".into(),
            (false, false) => "not printing".into(),
        },
        ControllerEvent::PrintFinished => notice("print finished".into(), Success, color),
        ControllerEvent::PrintProgress { progress } => {
            let mut text = format!("progress {:.1}% ({})", progress.percent, progress.source);
            if let Some(total) = progress.layer_count {
                text.push_str(&format!(", layer {}/{total}", progress.current_layer));
            } else if progress.current_layer > 0 {
                text.push_str(&format!(", layer {}", progress.current_layer));
            }
            text
        }
        ControllerEvent::LayerHistory { layers } => {
            let last = layers.last()?;
            format!("layer {} took {:.0}s", last.layer, last.duration)
        }
        ControllerEvent::AxesHomedChanged { homed } => {
            let axes: String = homed
                .iter()
                .zip(["X", "Y", "Z", "U", "V", "W", "A", "B", "C"])
                .map(|(h, axis)| if *h { axis.to_owned() } else { axis.to_lowercase() })
                .collect::<Vec<_>>()
                .join(" ");
            format!("homed {axes}")
        }
        ControllerEvent::ToolChanged { previous, current } => format!(
            "tool {} -> {}",
            previous.map_or_else(|| "none".into(), |t| format!("T{t}")),
            current.map_or_else(|| "none".into(), |t| format!("T{t}")),
        ),
        ControllerEvent::AtxPowerChanged { on } => {
            format!("ATX power {}", if *on { "on" } else { "off" })
        }
        ControllerEvent::FansUpdated { values } => format!(
            "fans {}",
            values
                .iter()
                .map(|v| format!("{:.0}%", v * 100.0))
                .collect::<Vec<_>>()
                .join(" ")
        ),
        ControllerEvent::HeatersInUseChanged { bed, chamber } => format!(
            "bed heater {}, chamber heater {}",
            bed.map_or_else(|| "-".into(), |h| h.to_string()),
            chamber.map_or_else(|| "-".into(), |h| h.to_string()),
        ),
        ControllerEvent::Temperatures { sample } => temperatures(sample),
        ControllerEvent::Beep {
            frequency,
            duration_ms,
        } => format!("beep {frequency} Hz for {duration_ms} ms"),
        ControllerEvent::FirmwareMessage { message } => notice(message.clone(), Info, color),
        ControllerEvent::MessageBox { message_box } => {
            let title = if color {
                message_box.title.bold().to_string()
            } else {
                message_box.title.clone()
            };
            format!("[{title}] {}", message_box.message)
        }
        ControllerEvent::MessageBoxClosed => "message box closed".into(),
        ControllerEvent::ConsoleReply { entry } => console_line(entry, color),
        ControllerEvent::BedCompensation { points } => {
            format!("bed compensation fitted {} points", points.len())
        }
        ControllerEvent::HeightmapReady => notice("height map ready".into(), Success, color),
        ControllerEvent::MountRetryRequested { volume } => {
            notice(format!("mounting volume {volume} failed, retrying"), Warning, color)
        }
        ControllerEvent::ScannerAppeared => "scanner connected".into(),
        ControllerEvent::ScannerDisappeared => "scanner disconnected".into(),
        ControllerEvent::ScannerReadyChanged { ready } => {
            format!("scanner {}", if *ready { "ready" } else { "busy" })
        }
        ControllerEvent::ScanFinished => notice("scan finished".into(), Success, color),
        ControllerEvent::ReconnectScheduled { reason, delay } => notice(
            format!("{reason}: reconnecting in {}s", delay.as_secs()),
            Warning,
            color,
        ),
        ControllerEvent::ConfirmationRequested { kind } => notice(
            format!("confirmation needed: {kind}"),
            Warning,
            color,
        ),
        ControllerEvent::ReloadRequested => {
            notice("web interface updated".into(), Warning, color)
        }
    };
    Some(line)
}

fn temperatures(sample: &TemperatureSample) -> String {
    let mut parts = Vec::new();
    if let Some(ref bed) = sample.bed {
        parts.push(format!("bed {:.1}/{:.1}", bed.current, bed.active));
    }
    if let Some(ref chamber) = sample.chamber {
        parts.push(format!("chamber {:.1}/{:.1}", chamber.current, chamber.active));
    }
    for heater in &sample.heaters {
        match heater.active {
            Some(active) => parts.push(format!("H{} {:.1}/{active:.1}", heater.heater, heater.current)),
            None => parts.push(format!("H{} {:.1}", heater.heater, heater.current)),
        }
    }
    for sensor in &sample.extra {
        parts.push(format!("{} {:.1}", sensor.name, sensor.temp));
    }
    format!("temps {}", parts.join(" "))
}

/// Parse `FAN=VALUE` pairs.
fn parse_fan_overrides(raw: &[String]) -> Result<Vec<(usize, f64)>, CliError> {
    raw.iter()
        .map(|pair| {
            let invalid = |reason: &str| CliError::Validation {
                field: "fan".into(),
                reason: format!("{pair}: {reason}"),
            };
            let (fan, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid("expected FAN=VALUE"))?;
            let fan: usize = fan.trim().parse().map_err(|_| invalid("fan must be a number"))?;
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|_| invalid("value must be a number"))?;
            if !(0.0..=1.0).contains(&value) {
                return Err(invalid("value must be between 0 and 1"));
            }
            Ok((fan, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use duetlink_core::ReconnectReason;

    use super::*;

    #[test]
    fn fan_overrides_parse_and_validate() {
        let parsed = parse_fan_overrides(&["0=0.8".to_owned(), " 2 = 1 ".to_owned()]).expect("valid pairs");
        assert_eq!(parsed, vec![(0, 0.8), (2, 1.0)]);

        assert!(parse_fan_overrides(&["0".to_owned()]).is_err());
        assert!(parse_fan_overrides(&["x=0.5".to_owned()]).is_err());
        assert!(parse_fan_overrides(&["1=50".to_owned()]).is_err());
    }

    #[test]
    fn console_reply_carries_gcode() {
        let event = ControllerEvent::ConsoleReply {
            entry: ConsoleEntry {
                style: ConsoleStyle::Warning,
                gcode: Some("G28".into()),
                message: "Warning: endstop not hit".into(),
            },
        };
        assert_eq!(
            describe(&event, false).as_deref(),
            Some("G28: Warning: endstop not hit")
        );
    }

    #[test]
    fn reconnect_shows_reason_and_delay() {
        let event = ControllerEvent::ReconnectScheduled {
            reason: ReconnectReason::Halt,
            delay: Duration::from_secs(5),
        };
        assert_eq!(
            describe(&event, false).as_deref(),
            Some("emergency stop: reconnecting in 5s")
        );
    }

    #[test]
    fn homed_axes_are_upper_case() {
        let event = ControllerEvent::AxesHomedChanged {
            homed: vec![true, false, true],
        };
        assert_eq!(describe(&event, false).as_deref(), Some("homed X y Z"));
    }

    #[test]
    fn per_poll_events_are_filtered() {
        assert!(is_per_poll(&ControllerEvent::FansUpdated { values: vec![0.5] }));
        assert!(!is_per_poll(&ControllerEvent::PrintFinished));
        assert_eq!(describe(&ControllerEvent::FilamentListRequested, false), None);
    }

    #[test]
    fn uncolored_console_is_verbatim() {
        assert_eq!(paint_console("Error: bad", ConsoleStyle::Error, false), "Error: bad");
        assert_ne!(paint_console("Error: bad", ConsoleStyle::Error, true), "Error: bad");
    }
}
