// ── Console reply interpretation ──
//
// Classifies the text returned by `rr_reply` and spots the few firmware
// reports that call for a follow-up (bed compensation points, a finished
// grid probe, a failed mount). Pure: the controller decides what to do
// with the outcome.

use serde::Serialize;
use strum::Display;
use tracing::warn;

const BED_POINTS_PREFIX: &str = "Bed equation fits points ";
const GRID_PROBED_MARKER: &str = " points probed, mean error ";
const MOUNT_FAILURE_MARKERS: [&str; 2] = ["Cannot initialise", "Can't mount"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum ConsoleStyle {
    Success,
    Info,
    Warning,
    Error,
}

impl ConsoleStyle {
    /// Style of a trimmed reply, decided by its literal prefix.
    pub fn of(reply: &str) -> Self {
        if reply.starts_with("Warning: ") {
            Self::Warning
        } else if reply.starts_with("Error: ") {
            Self::Error
        } else if reply.is_empty() {
            Self::Success
        } else {
            Self::Info
        }
    }
}

/// One console line worth showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsoleEntry {
    pub style: ConsoleStyle,
    /// The G-code this is a reply to, if one was sent since the last reply.
    pub gcode: Option<String>,
    pub message: String,
}

/// State the interpretation depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplyContext<'a> {
    pub printing: bool,
    pub last_gcode: Option<&'a str>,
    /// Volume a mount was requested for and not yet confirmed.
    pub pending_mount: Option<u32>,
    pub log_success: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsoleOutcome {
    pub entry: Option<ConsoleEntry>,
    /// Probe points of a bed compensation report, `[x, y, z]` each.
    pub bed_points: Option<Vec<Vec<f64>>>,
    pub heightmap_ready: bool,
    /// Volume whose mount failed and should be retried.
    pub mount_retry: Option<u32>,
    pub bed_points_cleared: bool,
}

/// Interpret one `rr_reply` body.
pub fn interpret(reply: &str, ctx: &ReplyContext<'_>) -> ConsoleOutcome {
    let reply = reply.trim();
    let mut outcome = ConsoleOutcome::default();

    if !ctx.printing && !reply.is_empty() {
        if let Some(points) = reply.strip_prefix(BED_POINTS_PREFIX) {
            outcome.bed_points = parse_bed_points(points);
        }
        outcome.heightmap_ready = reply.contains(GRID_PROBED_MARKER);
        if MOUNT_FAILURE_MARKERS.iter().any(|m| reply.contains(m)) {
            outcome.mount_retry = ctx.pending_mount;
        }
    }

    let gcode = ctx.last_gcode.map(str::trim).filter(|g| !g.is_empty());
    outcome.bed_points_cleared = gcode == Some("M561");

    if !reply.is_empty() || (gcode.is_some() && ctx.log_success) {
        outcome.entry = Some(ConsoleEntry {
            style: ConsoleStyle::of(reply),
            gcode: gcode.map(str::to_owned),
            message: reply.to_owned(),
        });
    }

    outcome
}

/// `[0.0, 0.0, 0.012] [100.0, 0.0, -0.03]` → `[[0,0,0.012],[100,0,-0.03]]`
fn parse_bed_points(text: &str) -> Option<Vec<Vec<f64>>> {
    let json = format!("[{}]", text.trim().split("] [").collect::<Vec<_>>().join("],["));
    match serde_json::from_str(&json) {
        Ok(points) => Some(points),
        Err(e) => {
            warn!(error = %e, report = text, "unparseable bed compensation report");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn style_is_prefix_based_and_case_sensitive() {
        assert_eq!(ConsoleStyle::of("Warning: low voltage"), ConsoleStyle::Warning);
        assert_eq!(ConsoleStyle::of("Error: bad command"), ConsoleStyle::Error);
        assert_eq!(ConsoleStyle::of("error: bad command"), ConsoleStyle::Info);
        assert_eq!(ConsoleStyle::of("ok"), ConsoleStyle::Info);
        assert_eq!(ConsoleStyle::of(""), ConsoleStyle::Success);
    }

    #[test]
    fn bed_compensation_report_is_parsed() {
        let outcome = interpret(
            "Bed equation fits points [0.0, 0.0, 0.012] [200.0, 0.0, -0.031] [100.0, 200.0, 0.004]\n",
            &ReplyContext::default(),
        );
        assert_eq!(
            outcome.bed_points,
            Some(vec![
                vec![0.0, 0.0, 0.012],
                vec![200.0, 0.0, -0.031],
                vec![100.0, 200.0, 0.004],
            ])
        );
        assert_eq!(outcome.entry.map(|e| e.style), Some(ConsoleStyle::Info));
    }

    #[test]
    fn reports_are_ignored_while_printing() {
        let ctx = ReplyContext {
            printing: true,
            pending_mount: Some(1),
            ..ReplyContext::default()
        };
        let outcome = interpret("121 points probed, mean error 0.042, deviation 0.020", &ctx);
        assert!(!outcome.heightmap_ready);

        let outcome = interpret("Error: Can't mount volume 1", &ctx);
        assert_eq!(outcome.mount_retry, None);
    }

    #[test]
    fn grid_probe_marker_requests_heightmap() {
        let outcome = interpret(
            "121 points probed, mean error 0.042, deviation 0.020",
            &ReplyContext::default(),
        );
        assert!(outcome.heightmap_ready);
    }

    #[test]
    fn mount_failure_only_matters_with_pending_mount() {
        let reply = "Error: Cannot initialise SD card 1: Card not present";
        assert_eq!(interpret(reply, &ReplyContext::default()).mount_retry, None);

        let ctx = ReplyContext {
            pending_mount: Some(1),
            ..ReplyContext::default()
        };
        assert_eq!(interpret(reply, &ctx).mount_retry, Some(1));
    }

    #[test]
    fn empty_reply_is_logged_only_with_log_success() {
        let ctx = ReplyContext {
            last_gcode: Some("G28"),
            ..ReplyContext::default()
        };
        assert_eq!(interpret("", &ctx).entry, None);

        let ctx = ReplyContext {
            log_success: true,
            ..ctx
        };
        assert_eq!(
            interpret("  ", &ctx).entry,
            Some(ConsoleEntry {
                style: ConsoleStyle::Success,
                gcode: Some("G28".into()),
                message: String::new(),
            })
        );
    }

    #[test]
    fn m561_clears_bed_points() {
        let ctx = ReplyContext {
            last_gcode: Some("M561"),
            ..ReplyContext::default()
        };
        assert!(interpret("", &ctx).bed_points_cleared);
    }
}
