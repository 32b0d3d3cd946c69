// Raw response payloads of the rr_* endpoints.
//
// These mirror the firmware JSON closely and are deliberately lenient:
// nearly every field defaults when absent, since the three status levels
// (and different firmware versions) send different subsets. Normalization
// into domain types happens in duetlink-core.

use serde::Deserialize;

// ── Session ──────────────────────────────────────────────────────────

/// Response of `rr_connect`.
///
/// `err`: 0 = connected, 1 = wrong or missing password, 2 = no free session.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub err: u32,
    /// Milliseconds before the firmware drops an idle session.
    pub session_timeout: Option<u64>,
    pub board_type: Option<String>,
}

// ── Status ───────────────────────────────────────────────────────────

/// Verbosity level requested from `rr_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusLevel {
    /// `type=1`: the regular, compact status.
    Default,
    /// `type=2`: adds rarely changing machine properties.
    Extended,
    /// `type=3`: adds print progress fields.
    Print,
}

impl StatusLevel {
    pub fn as_query(self) -> &'static str {
        match self {
            Self::Default => "1",
            Self::Extended => "2",
            Self::Print => "3",
        }
    }
}

/// Either a scalar or an array. Older firmware reports some per-fan values
/// as a single number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

/// Response of `rr_status?type=N`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// One-letter machine status code.
    pub status: String,
    #[serde(default)]
    pub coords: RawCoords,
    #[serde(default = "no_tool")]
    pub current_tool: i32,
    pub output: Option<RawOutput>,
    #[serde(default)]
    pub params: RawParams,
    /// Incremented by the firmware whenever new console output is available.
    #[serde(default)]
    pub seq: u64,
    #[serde(default)]
    pub sensors: RawSensors,
    #[serde(default)]
    pub temps: RawTemps,
    pub time: Option<f64>,
    pub scanner: Option<RawScanner>,

    // ── Extended (type=2) ────────────────────────────────────────────
    pub cold_extrude_temp: Option<f64>,
    pub cold_retract_temp: Option<f64>,
    pub temp_limit: Option<f64>,
    pub endstops: Option<u32>,
    pub firmware_name: Option<String>,
    pub geometry: Option<String>,
    pub axes: Option<u32>,
    pub volumes: Option<u32>,
    pub mounted_volumes: Option<u32>,
    pub name: Option<String>,
    pub probe: Option<RawProbe>,
    pub tools: Option<Vec<RawTool>>,
    pub vin: Option<RawVoltage>,

    // ── Print (type=3) ───────────────────────────────────────────────
    pub current_layer: Option<u32>,
    pub current_layer_time: Option<f64>,
    pub extr_raw: Option<Vec<f64>>,
    pub fraction_printed: Option<f64>,
    pub first_layer_duration: Option<f64>,
    pub first_layer_height: Option<f64>,
    pub print_duration: Option<f64>,
    pub warm_up_duration: Option<f64>,
    pub times_left: Option<RawTimesLeft>,
}

fn no_tool() -> i32 {
    -1
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawCoords {
    /// 0/1 per axis.
    pub axes_homed: Vec<u8>,
    pub extr: Vec<f64>,
    pub xyz: Vec<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawParams {
    pub atx_power: u8,
    /// Fan duty in percent.
    pub fan_percent: OneOrMany<f64>,
    pub speed_factor: f64,
    pub extr_factors: Vec<f64>,
    pub babystep: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawSensors {
    pub probe_value: i64,
    pub probe_secondary: Option<Vec<i64>>,
    #[serde(rename = "fanRPM")]
    pub fan_rpm: OneOrMany<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTemps {
    pub bed: Option<RawHeaterBlock>,
    pub chamber: Option<RawHeaterBlock>,
    /// Unified layout: current temperature per heater index.
    pub current: Option<Vec<f64>>,
    /// Unified layout: state per heater index.
    pub state: Option<Vec<u8>>,
    /// Legacy layout: per-head arrays.
    pub heads: Option<RawHeads>,
    pub tools: Option<RawToolTemps>,
    pub extra: Option<Vec<RawExtraSensor>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawHeaterBlock {
    pub current: f64,
    pub active: f64,
    pub standby: Option<f64>,
    pub state: u8,
    /// Heater index driving this zone, when not the default.
    pub heater: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawHeads {
    pub current: Vec<f64>,
    pub active: Vec<f64>,
    pub standby: Vec<f64>,
    pub state: Vec<u8>,
}

/// Active/standby targets indexed by `[tool][heater-of-tool]`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawToolTemps {
    pub active: Vec<Vec<f64>>,
    pub standby: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawExtraSensor {
    pub name: String,
    pub temp: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawScanner {
    pub status: String,
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawOutput {
    pub beep_duration: Option<u32>,
    pub beep_frequency: Option<u32>,
    pub message: Option<String>,
    pub msg_box: Option<RawMessageBox>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawMessageBox {
    pub msg: String,
    pub title: String,
    pub mode: i32,
    pub seq: Option<u64>,
    pub timeout: Option<f64>,
    pub controls: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawProbe {
    pub threshold: f64,
    pub height: f64,
    #[serde(rename = "type")]
    pub probe_type: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawTool {
    pub number: i32,
    pub name: Option<String>,
    pub heaters: Vec<usize>,
    pub drives: Vec<usize>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct RawVoltage {
    pub min: f64,
    pub cur: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct RawTimesLeft {
    pub file: Option<f64>,
    pub filament: Option<f64>,
    pub layer: Option<f64>,
}

// ── Files ────────────────────────────────────────────────────────────

/// Response of `rr_fileinfo`.
///
/// `err`: 0 = valid, 1 = no such file, 2 = firmware still parsing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileInfoResponse {
    pub err: u32,
    pub file_name: Option<String>,
    pub size: Option<u64>,
    pub height: Option<f64>,
    pub first_layer_height: Option<f64>,
    pub layer_height: Option<f64>,
    pub filament: Vec<f64>,
    pub generated_by: Option<String>,
    pub print_duration: Option<f64>,
}

/// `0:/sys/oem.json`, present on vendor-customized boards.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OemFeatures {
    pub vendor: Option<String>,
}
