//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one value per line.

use std::io::{self, IsTerminal, Write};

use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since detail views are key/value
/// listings rather than rows.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Aligned `key: value` lines for detail views.
pub fn detail_lines(pairs: &[(&str, String)]) -> String {
    let width = pairs.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    pairs
        .iter()
        .map(|(k, v)| format!("{k:>width$}: {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(rendered)
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}
