//! `duetlink gcode`: send G-code, print what the board answers.

use std::time::Duration;

use serde::Serialize;

use duetlink_core::{ConsoleStyle, ControllerConfig};

use crate::cli::{GcodeArgs, GlobalOpts};
use crate::commands::{self, monitor};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct GcodeReply {
    sent: Vec<String>,
    style: ConsoleStyle,
    reply: String,
}

pub async fn handle(
    mut config: ControllerConfig,
    args: GcodeArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.uppercase {
        config.uppercase_gcode = true;
    }
    let lines: Vec<String> = args
        .lines
        .iter()
        .map(|l| l.trim().to_owned())
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(CliError::Validation {
            field: "gcode".into(),
            reason: "nothing to send".into(),
        });
    }

    let wait = Duration::from_millis(args.wait);
    let collect_reply = !args.no_reply;
    let reply = commands::oneshot(config, |controller| {
        let lines = lines.clone();
        async move {
            for line in &lines {
                controller.send_gcode(line).await?;
            }
            if !collect_reply {
                return Ok(String::new());
            }
            tokio::time::sleep(wait).await;
            controller.fetch_reply().await
        }
    })
    .await?;

    if !collect_reply {
        return Ok(());
    }

    let reply = reply.trim().to_owned();
    let result = GcodeReply {
        sent: lines,
        style: ConsoleStyle::of(&reply),
        reply,
    };
    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &result,
        |r| {
            if r.reply.is_empty() {
                String::new()
            } else {
                monitor::paint_console(&r.reply, r.style, color)
            }
        },
        |r| r.reply.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
