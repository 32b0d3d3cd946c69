// ── Status reconciler ──
//
// Diffs each snapshot against the previous one and turns the differences
// into events plus a few follow-up requests for the controller. Steps run
// in a fixed order per snapshot; the previous snapshot is only replaced at
// the very end.

use std::sync::Arc;

use tracing::{debug, info};

use crate::event::{ControllerEvent, SnapshotDelta};
use crate::model::{FileInfo, MachineInfo, MachineStatus, ScannerStatus, StatusSnapshot};
use crate::progress::PrintTracker;
use crate::recovery::FirmwareState;
use crate::temperature::{self, HeatersInUse};

/// Vendor whose scanner may only be used with all axes homed.
const DIABASE_VENDOR: &str = "diabase";

/// Result of reconciling one snapshot.
#[derive(Debug)]
pub struct Reconciliation {
    pub snapshot: Arc<StatusSnapshot>,
    pub events: Vec<ControllerEvent>,
    /// G-code to send (fan overrides being re-asserted).
    pub gcode: Vec<String>,
    /// New console output may be waiting in `rr_reply`.
    pub fetch_reply: bool,
    /// A print just started; its file info is needed for progress.
    pub request_file_info: bool,
    pub firmware: FirmwareState,
}

#[derive(Debug)]
pub struct Reconciler {
    previous: Option<Arc<StatusSnapshot>>,
    machine: MachineInfo,
    printing: bool,
    paused: bool,
    /// Locally chosen fan values (0..=1) that win over the firmware's.
    fan_overrides: Vec<Option<f64>>,
    fans: Vec<f64>,
    heaters_in_use: HeatersInUse,
    file_info: Option<FileInfo>,
    tracker: PrintTracker,
    vendor: Option<String>,
    scanner_ready: Option<bool>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self {
            previous: None,
            machine: MachineInfo::default(),
            printing: false,
            paused: false,
            fan_overrides: Vec::new(),
            fans: Vec::new(),
            heaters_in_use: HeatersInUse::default(),
            file_info: None,
            tracker: PrintTracker::new(),
            vendor: None,
            scanner_ready: None,
        }
    }

    /// Forget the session. Fan overrides are user choices and survive.
    pub fn reset(&mut self) {
        let fan_overrides = std::mem::take(&mut self.fan_overrides);
        *self = Self {
            fan_overrides,
            ..Self::new()
        };
    }

    pub fn previous(&self) -> Option<&Arc<StatusSnapshot>> {
        self.previous.as_ref()
    }

    pub fn machine(&self) -> &MachineInfo {
        &self.machine
    }

    pub fn is_printing(&self) -> bool {
        self.printing
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn fans(&self) -> &[f64] {
        &self.fans
    }

    pub fn fan_overrides(&self) -> &[Option<f64>] {
        &self.fan_overrides
    }

    /// Pin `fan` to `value` (0..=1), or release it with `None`.
    pub fn set_fan_override(&mut self, fan: usize, value: Option<f64>) {
        if self.fan_overrides.len() <= fan {
            self.fan_overrides.resize(fan + 1, None);
        }
        self.fan_overrides[fan] = value.map(|v| v.clamp(0.0, 1.0));
    }

    pub fn file_info(&self) -> Option<&FileInfo> {
        self.file_info.as_ref()
    }

    pub fn set_file_info(&mut self, info: Option<FileInfo>) {
        self.file_info = info;
    }

    pub fn set_vendor(&mut self, vendor: Option<String>) {
        self.vendor = vendor;
    }

    pub fn reconcile(&mut self, snapshot: StatusSnapshot) -> Reconciliation {
        let previous = self.previous.clone();
        let prev = previous.as_deref();

        let mut events = Vec::new();
        let mut gcode = Vec::new();
        let mut delta = SnapshotDelta {
            initial: prev.is_none(),
            status_changed: prev.is_none_or(|p| p.status != snapshot.status),
            ..SnapshotDelta::default()
        };

        self.merge_machine_info(&snapshot, &mut events, &mut delta);
        let request_file_info = self.update_activity(&snapshot, &mut events);
        Self::diff_motion(prev, &snapshot, &mut events, &mut delta);
        Self::diff_output(prev, &snapshot, &mut events);
        self.reconcile_fans(prev, &snapshot, &mut events, &mut gcode, &mut delta);
        let fetch_reply = Self::reply_pending(prev, &snapshot, &mut delta);
        self.reconcile_heaters(prev, &snapshot, &mut events, &mut delta);
        self.track_print(&snapshot, &mut events);
        self.diff_scanner(prev, &snapshot, &mut events);

        let firmware = FirmwareState::from(snapshot.status);
        let snapshot = Arc::new(snapshot);
        events.push(ControllerEvent::SnapshotUpdated {
            snapshot: Arc::clone(&snapshot),
            delta,
        });
        self.previous = Some(Arc::clone(&snapshot));

        Reconciliation {
            snapshot,
            events,
            gcode,
            fetch_reply,
            request_file_info,
            firmware,
        }
    }

    // ── Steps ────────────────────────────────────────────────────────

    fn merge_machine_info(
        &mut self,
        snapshot: &StatusSnapshot,
        events: &mut Vec<ControllerEvent>,
        delta: &mut SnapshotDelta,
    ) {
        let Some(ext) = &snapshot.extended else {
            return;
        };
        let merged = self.machine.merge(ext);
        if merged.tools_changed {
            delta.layout_changed = true;
        }
        if merged.changed {
            events.push(ControllerEvent::MachineInfoUpdated {
                info: Arc::new(self.machine.clone()),
            });
        }
    }

    /// Printing/paused flags. Returns whether a print just started.
    fn update_activity(&mut self, snapshot: &StatusSnapshot, events: &mut Vec<ControllerEvent>) -> bool {
        let Some((printing, paused)) = snapshot.status.activity(self.printing) else {
            debug!(code = %snapshot.status.code(), "unknown status code, keeping print state");
            return false;
        };

        let started = printing && !self.printing;
        if started {
            info!("print started");
            self.tracker.reset();
            self.file_info = None;
            events.push(ControllerEvent::PrintStarted);
        }
        if (printing, paused) != (self.printing, self.paused) {
            events.push(ControllerEvent::PrintStatusChanged { printing, paused });
        }
        self.printing = printing;
        self.paused = paused;
        started
    }

    fn diff_motion(
        prev: Option<&StatusSnapshot>,
        snapshot: &StatusSnapshot,
        events: &mut Vec<ControllerEvent>,
        delta: &mut SnapshotDelta,
    ) {
        if prev.is_none_or(|p| p.coords.axes_homed != snapshot.coords.axes_homed) {
            delta.axes_homed_changed = true;
            events.push(ControllerEvent::AxesHomedChanged {
                homed: snapshot.coords.axes_homed.clone(),
            });
        }

        if prev.is_none_or(|p| p.current_tool != snapshot.current_tool) {
            delta.tool_changed = true;
            events.push(ControllerEvent::ToolChanged {
                previous: prev.and_then(|p| p.current_tool),
                current: snapshot.current_tool,
            });
        }

        let layout_changed = prev.is_none_or(|p| {
            p.coords.xyz.len() != snapshot.coords.xyz.len()
                || p.coords.extruders.len() != snapshot.coords.extruders.len()
                || p.temps.heaters.len() != snapshot.temps.heaters.len()
                || p.temps.extra.len() != snapshot.temps.extra.len()
        });
        delta.layout_changed |= layout_changed;

        if prev.is_none_or(|p| p.params.atx_power != snapshot.params.atx_power) {
            events.push(ControllerEvent::AtxPowerChanged {
                on: snapshot.params.atx_power,
            });
        }
    }

    fn diff_output(prev: Option<&StatusSnapshot>, snapshot: &StatusSnapshot, events: &mut Vec<ControllerEvent>) {
        if let Some(output) = &snapshot.output {
            if let Some(beep) = output.beep {
                events.push(ControllerEvent::Beep {
                    frequency: beep.frequency,
                    duration_ms: beep.duration_ms,
                });
            }
            if let Some(message) = &output.message {
                events.push(ControllerEvent::FirmwareMessage {
                    message: message.clone(),
                });
            }
        }

        let current = snapshot.output.as_ref().and_then(|o| o.message_box.as_ref());
        let before = prev
            .and_then(|p| p.output.as_ref())
            .and_then(|o| o.message_box.as_ref());
        match (current, before) {
            (Some(message_box), before) if before != Some(message_box) => {
                events.push(ControllerEvent::MessageBox {
                    message_box: message_box.clone(),
                });
            }
            (None, Some(_)) => events.push(ControllerEvent::MessageBoxClosed),
            _ => {}
        }
    }

    fn reconcile_fans(
        &mut self,
        prev: Option<&StatusSnapshot>,
        snapshot: &StatusSnapshot,
        events: &mut Vec<ControllerEvent>,
        gcode: &mut Vec<String>,
        delta: &mut SnapshotDelta,
    ) {
        let mut effective = Vec::with_capacity(snapshot.params.fan_percent.len());
        for (fan, percent) in snapshot.params.fan_percent.iter().enumerate() {
            let reported = percent / 100.0;
            match self.fan_overrides.get(fan).copied().flatten() {
                Some(wanted) if (wanted - reported).abs() > f64::EPSILON => {
                    debug!(fan, wanted, reported, "re-asserting fan override");
                    gcode.push(format!("M106 P{fan} S{wanted}"));
                    effective.push(wanted);
                }
                _ => effective.push(reported),
            }
        }

        if prev.is_none() || effective != self.fans {
            delta.fans_changed = true;
            events.push(ControllerEvent::FansUpdated {
                values: effective.clone(),
            });
        }
        self.fans = effective;
    }

    fn reply_pending(prev: Option<&StatusSnapshot>, snapshot: &StatusSnapshot, delta: &mut SnapshotDelta) -> bool {
        let Some(prev) = prev else {
            delta.seq_changed = true;
            return true;
        };
        if snapshot.seq < prev.seq {
            info!(
                previous = prev.seq,
                current = snapshot.seq,
                "sequence number went backwards, firmware session was reset"
            );
        }
        delta.seq_changed = snapshot.seq != prev.seq;
        delta.seq_changed && snapshot.status != MachineStatus::Updating
    }

    fn reconcile_heaters(
        &mut self,
        prev: Option<&StatusSnapshot>,
        snapshot: &StatusSnapshot,
        events: &mut Vec<ControllerEvent>,
        delta: &mut SnapshotDelta,
    ) {
        let in_use = HeatersInUse::from_temps(&snapshot.temps);
        if prev.is_none() || in_use != self.heaters_in_use {
            delta.heaters_in_use_changed = true;
            events.push(ControllerEvent::HeatersInUseChanged {
                bed: in_use.bed,
                chamber: in_use.chamber,
            });
        }
        self.heaters_in_use = in_use;

        events.push(ControllerEvent::Temperatures {
            sample: temperature::sample(&snapshot.temps, in_use, &self.machine.tools),
        });
    }

    fn track_print(&mut self, snapshot: &StatusSnapshot, events: &mut Vec<ControllerEvent>) {
        let (Some(file), Some(print)) = (&self.file_info, &snapshot.print) else {
            return;
        };
        let update = self.tracker.update(file, print, snapshot.z());

        if let Some(progress) = update.progress {
            events.push(ControllerEvent::PrintProgress { progress });
        }
        if update.layers_changed {
            events.push(ControllerEvent::LayerHistory {
                layers: self.tracker.layers().to_vec(),
            });
        }
        if update.finished {
            info!("print finished");
            events.push(ControllerEvent::PrintFinished);
        }
    }

    fn diff_scanner(&mut self, prev: Option<&StatusSnapshot>, snapshot: &StatusSnapshot, events: &mut Vec<ControllerEvent>) {
        let before = prev.and_then(|p| p.scanner.as_ref());

        let Some(scanner) = &snapshot.scanner else {
            if before.is_some() {
                self.scanner_ready = None;
                events.push(ControllerEvent::ScannerDisappeared);
            }
            return;
        };

        if before.is_none() {
            events.push(ControllerEvent::ScannerAppeared);
        }

        let homing_required = self.vendor.as_deref() == Some(DIABASE_VENDOR);
        let ready = scanner.is_idle() && (!homing_required || snapshot.all_axes_homed());
        if self.scanner_ready != Some(ready) {
            self.scanner_ready = Some(ready);
            events.push(ControllerEvent::ScannerReadyChanged { ready });
        }

        if scanner.is_idle() && before.is_some_and(ScannerStatus::is_busy) {
            events.push(ControllerEvent::ScanFinished);
        }
    }
}
