// ── Controller events ──
//
// Everything the core decides for its collaborators goes out as one of
// these on the controller's broadcast channel. Consumers render, prompt or
// fetch; the core never does any of that itself.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::console::ConsoleEntry;
use crate::model::{MachineInfo, MessageBox, StatusSnapshot};
use crate::progress::{LayerEntry, PrintProgress};
use crate::recovery::{ConfirmationKind, ReconnectReason};
use crate::temperature::TemperatureSample;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControllerEvent {
    // ── Session ──────────────────────────────────────────────────────
    ConnectionEstablished {
        board_type: Option<String>,
    },
    ConnectionLost {
        reason: String,
    },
    /// The board wants a (different) password.
    PasswordRequired,
    /// The board has no free HTTP session.
    SessionCapacityExceeded,
    /// Post-connect hint for the filament manager to reload its list.
    FilamentListRequested,

    // ── Status ───────────────────────────────────────────────────────
    SnapshotUpdated {
        snapshot: Arc<StatusSnapshot>,
        delta: SnapshotDelta,
    },
    MachineInfoUpdated {
        info: Arc<MachineInfo>,
    },
    PrintStarted,
    PrintStatusChanged {
        printing: bool,
        paused: bool,
    },
    PrintFinished,
    PrintProgress {
        progress: PrintProgress,
    },
    LayerHistory {
        layers: Vec<LayerEntry>,
    },
    AxesHomedChanged {
        homed: Vec<bool>,
    },
    ToolChanged {
        previous: Option<i32>,
        current: Option<i32>,
    },
    AtxPowerChanged {
        on: bool,
    },
    FansUpdated {
        /// Effective duty per fan, 0..=1.
        values: Vec<f64>,
    },
    HeatersInUseChanged {
        bed: Option<usize>,
        chamber: Option<usize>,
    },
    Temperatures {
        sample: TemperatureSample,
    },

    // ── Firmware output ──────────────────────────────────────────────
    Beep {
        frequency: u32,
        duration_ms: u32,
    },
    FirmwareMessage {
        message: String,
    },
    MessageBox {
        message_box: MessageBox,
    },
    MessageBoxClosed,
    ConsoleReply {
        entry: ConsoleEntry,
    },
    BedCompensation {
        points: Vec<Vec<f64>>,
    },
    HeightmapReady,
    BedPointsCleared,
    MountRetryRequested {
        volume: u32,
    },

    // ── Scanner ──────────────────────────────────────────────────────
    ScannerAppeared,
    ScannerDisappeared,
    ScannerReadyChanged {
        ready: bool,
    },
    ScanFinished,

    // ── Recovery ─────────────────────────────────────────────────────
    ReconnectScheduled {
        reason: ReconnectReason,
        delay: Duration,
    },
    ConfirmationRequested {
        kind: ConfirmationKind,
    },
    /// The web interface was replaced; the host should reload it.
    ReloadRequested,
}

/// Which parts of the snapshot changed relative to the previous one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct SnapshotDelta {
    /// No previous snapshot existed (first poll of the session).
    pub initial: bool,
    pub status_changed: bool,
    pub axes_homed_changed: bool,
    pub tool_changed: bool,
    /// Axis, extruder, heater, sensor or tool counts changed.
    pub layout_changed: bool,
    pub fans_changed: bool,
    pub seq_changed: bool,
    pub heaters_in_use_changed: bool,
}
