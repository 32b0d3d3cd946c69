// ── Status snapshot ──
//
// One normalized `rr_status` response. Built once per poll and never
// mutated afterwards; the reconciler keeps the previous one around to diff
// against.

use serde::Serialize;

use super::machine::{ProbeParams, Tool, Voltage};
use super::status::{HeaterState, MachineStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub status: MachineStatus,
    pub coords: Coordinates,
    /// Selected tool number, `None` when no tool is selected.
    pub current_tool: Option<i32>,
    pub params: Params,
    /// Console sequence number. Changes whenever new reply text is pending.
    pub seq: u64,
    pub sensors: Sensors,
    pub temps: Temperatures,
    pub output: Option<Output>,
    pub scanner: Option<ScannerStatus>,
    /// Seconds since the firmware started.
    pub uptime: Option<f64>,
    /// Present on extended (`type=2`) responses.
    pub extended: Option<ExtendedStatus>,
    /// Present on print (`type=3`) responses.
    pub print: Option<PrintStatus>,
}

impl StatusSnapshot {
    /// Z position, 0 when the machine reports fewer than three axes.
    pub fn z(&self) -> f64 {
        self.coords.xyz.get(2).copied().unwrap_or_default()
    }

    pub fn all_axes_homed(&self) -> bool {
        self.coords.axes_homed.iter().all(|homed| *homed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Coordinates {
    pub xyz: Vec<f64>,
    pub axes_homed: Vec<bool>,
    /// Extruder drive positions.
    pub extruders: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Params {
    pub atx_power: bool,
    /// Fan duty per fan, in percent.
    pub fan_percent: Vec<f64>,
    pub speed_factor: f64,
    pub extrusion_factors: Vec<f64>,
    /// Accumulated Z babystep offset. `None` if the firmware lacks support.
    pub babystep: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sensors {
    pub probe_value: i64,
    pub probe_secondary: Vec<i64>,
    pub fan_rpm: Vec<i64>,
}

// ── Temperatures ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Temperatures {
    pub bed: Option<HeaterZone>,
    pub chamber: Option<HeaterZone>,
    pub heaters: HeaterReadings,
    pub tools: Option<ToolTargets>,
    pub extra: Vec<ExtraSensor>,
}

/// Bed or chamber block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaterZone {
    pub current: f64,
    pub active: f64,
    pub standby: Option<f64>,
    pub state: HeaterState,
    /// Heater index configured for this zone, if the firmware reports one.
    pub heater: Option<usize>,
}

/// Per-heater readings. The firmware has used two layouts over time; which
/// one a payload uses is decided once when the snapshot is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum HeaterReadings {
    /// `temps.current` + `temps.state`, indexed by heater number.
    Unified {
        current: Vec<f64>,
        state: Vec<HeaterState>,
    },
    /// `temps.heads`: one entry per tool head, heater numbers starting at 1.
    Legacy { heads: Vec<HeadReading> },
    #[default]
    None,
}

impl HeaterReadings {
    /// Number of heater slots reported (layout dependent).
    pub fn len(&self) -> usize {
        match self {
            Self::Unified { current, .. } => current.len(),
            Self::Legacy { heads } => heads.len(),
            Self::None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadReading {
    pub current: f64,
    pub active: f64,
    pub standby: f64,
    pub state: HeaterState,
}

/// Active/standby targets indexed by `[tool slot][heater of tool]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ToolTargets {
    pub active: Vec<Vec<f64>>,
    pub standby: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraSensor {
    pub name: String,
    pub temp: f64,
}

// ── Output ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Output {
    pub beep: Option<Beep>,
    pub message: Option<String>,
    pub message_box: Option<MessageBox>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Beep {
    pub frequency: u32,
    pub duration_ms: u32,
}

/// Modal message requested with M291.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageBox {
    pub title: String,
    pub message: String,
    pub mode: i32,
    pub seq: Option<u64>,
    /// Seconds until the box closes by itself.
    pub timeout: Option<f64>,
    /// Bitmap of axes the user may jog while the box is open.
    pub controls: Option<u32>,
}

// ── Optional blocks ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScannerStatus {
    /// One-letter scanner state.
    pub status: String,
    pub progress: Option<f64>,
}

impl ScannerStatus {
    pub fn is_idle(&self) -> bool {
        self.status == "I"
    }

    /// Scanning, post-processing or uploading.
    pub fn is_busy(&self) -> bool {
        matches!(self.status.as_str(), "S" | "P" | "U")
    }
}

/// Rarely changing machine properties (extended responses only).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtendedStatus {
    pub firmware_name: Option<String>,
    pub name: Option<String>,
    pub geometry: Option<String>,
    pub axes: Option<u32>,
    pub cold_extrude_temp: Option<f64>,
    pub cold_retract_temp: Option<f64>,
    pub temp_limit: Option<f64>,
    pub endstops: Option<u32>,
    pub volumes: Option<u32>,
    pub mounted_volumes: Option<u32>,
    pub probe: Option<ProbeParams>,
    pub tools: Option<Vec<Tool>>,
    pub vin: Option<Voltage>,
}

/// Job progress fields (print responses only).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PrintStatus {
    /// Firmware's own estimate, in percent.
    pub fraction_printed: f64,
    pub current_layer: u32,
    pub current_layer_time: f64,
    /// Raw filament fed per extruder, in mm.
    pub extruded_raw: Vec<f64>,
    pub first_layer_duration: f64,
    pub first_layer_height: f64,
    pub print_duration: f64,
    pub warm_up_duration: f64,
    pub times_left: TimesLeft,
}

/// Remaining-time estimates in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TimesLeft {
    pub file: Option<f64>,
    pub filament: Option<f64>,
    pub layer: Option<f64>,
}
