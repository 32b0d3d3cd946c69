//! Clap derive structures for the `duetlink` CLI.
//!
//! Also pulled into `build.rs` for man page generation, so this file may
//! only depend on `clap` and `clap_complete`.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// duetlink -- talk to RepRapFirmware boards from the command line
#[derive(Debug, Parser)]
#[command(
    name = "duetlink",
    version,
    about = "Monitor and control RepRapFirmware (Duet) boards over HTTP",
    long_about = "Connects to a Duet board through its rr_* HTTP endpoints.\n\n\
        `monitor` keeps a session open and streams what the board does;\n\
        the other commands connect, do one thing and disconnect.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Board profile to use
    #[arg(long, short = 'p', env = "DUETLINK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Board address, bare host or URL (overrides profile)
    #[arg(long, short = 'H', env = "DUETLINK_HOST", global = true)]
    pub host: Option<String>,

    /// Board password (overrides profile and keyring)
    #[arg(long, env = "DUETLINK_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DUETLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Answer yes to every confirmation prompt
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates (boards behind a TLS proxy)
    #[arg(long, short = 'k', env = "DUETLINK_INSECURE", global = true)]
    pub insecure: bool,

    /// Connect timeout in seconds
    #[arg(long, env = "DUETLINK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable text and tables (default)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON (one event per line for `monitor`)
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Keep a session open and stream board events until interrupted
    #[command(alias = "mon", alias = "m")]
    Monitor(MonitorArgs),

    /// Fetch one status report
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Send G-code and print the board's reply
    #[command(alias = "g")]
    Gcode(GcodeArgs),

    /// Show metadata of the file being printed
    FileInfo,

    /// Dump the machine configuration reported by the board
    MachineConfig,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Monitor ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Also print per-poll events (snapshots, temperatures)
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Stop after this many seconds
    #[arg(long, short = 'd')]
    pub duration: Option<u64>,

    /// Status poll interval in milliseconds (overrides profile)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Fan override to hold, as FAN=VALUE with VALUE in 0..=1 (repeatable)
    #[arg(long = "fan", value_name = "FAN=VALUE")]
    pub fans: Vec<String>,
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Amount of detail to request
    #[arg(long, short = 'l', default_value = "extended")]
    pub level: StatusLevelArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusLevelArg {
    /// Compact status (type=1)
    Default,
    /// Adds machine properties (type=2)
    Extended,
    /// Adds print progress fields (type=3)
    Print,
}

// ── G-code ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GcodeArgs {
    /// G-code lines, sent in order
    #[arg(required = true, value_name = "GCODE")]
    pub lines: Vec<String>,

    /// Milliseconds to wait before collecting the reply
    #[arg(long, default_value = "250")]
    pub wait: u64,

    /// Do not collect the reply
    #[arg(long)]
    pub no_reply: bool,

    /// Upper-case the G-code before sending it
    #[arg(long, short = 'U')]
    pub uppercase: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show the current configuration
    Show,

    /// Print the configuration file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set a value on the active profile
    Set {
        /// Key: host, password_env, insecure, timeout, max_retries,
        /// update_interval_ms, uppercase_gcode, log_success
        key: String,
        /// Value
        value: String,
    },

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },

    /// Store the active profile's board password in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
