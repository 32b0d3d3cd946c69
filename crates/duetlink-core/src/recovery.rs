// ── Recovery controller ──
//
// Decides what happens when the firmware reports an emergency stop or a
// self-update. Pure state machine: it hands back an action, the
// controller owns the timers.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use strum::Display;
use tracing::{debug, info};

use crate::config::ControllerConfig;
use crate::model::MachineStatus;

/// Firmware state as far as recovery is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareState {
    Running,
    Halted,
    Updating,
}

impl From<MachineStatus> for FirmwareState {
    fn from(status: MachineStatus) -> Self {
        match status {
            MachineStatus::Halted => Self::Halted,
            MachineStatus::Updating => Self::Updating,
            _ => Self::Running,
        }
    }
}

/// Images an upload subsystem may be writing to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum UploadTarget {
    WebControl,
    WifiServer,
    Firmware,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum UpdateKind {
    WebControl,
    WifiServer,
    MainFirmware,
    /// More than one image at once.
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReconnectReason {
    Halt,
    SelfUpdate(UpdateKind),
}

impl fmt::Display for ReconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Halt => f.write_str("emergency stop"),
            Self::SelfUpdate(kind) => write!(f, "{kind} update"),
        }
    }
}

/// A reconnect the controller should perform after `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectTask {
    pub reason: ReconnectReason,
    pub delay: Duration,
    /// Ask the user to reload the web interface once reconnected.
    pub requires_confirmation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum ConfirmationKind {
    /// Board still halted after a reconnect: send M999?
    FirmwareReset,
    /// Web interface was updated: reload it?
    ReloadPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    None,
    /// Stop polling and reconnect later.
    Schedule(ReconnectTask),
    /// Ask the user; keep polling meanwhile.
    Confirm(ConfirmationKind),
    /// Updating with no known upload: give up the session.
    Abandon,
}

/// Per-target reconnect delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectDelays {
    pub halted: Duration,
    pub web_control: Duration,
    pub wifi_server: Duration,
    pub firmware: Duration,
}

impl From<&ControllerConfig> for ReconnectDelays {
    fn from(config: &ControllerConfig) -> Self {
        Self {
            halted: config.halted_reconnect_delay,
            web_control: config.web_control_reconnect_delay,
            wifi_server: config.wifi_server_reconnect_delay,
            firmware: config.firmware_reconnect_delay,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadsInProgress {
    pub web_control: bool,
    pub wifi_server: bool,
    pub firmware: bool,
}

impl UploadsInProgress {
    pub fn set(&mut self, target: UploadTarget, active: bool) {
        match target {
            UploadTarget::WebControl => self.web_control = active,
            UploadTarget::WifiServer => self.wifi_server = active,
            UploadTarget::Firmware => self.firmware = active,
        }
    }

    fn any(self) -> bool {
        self.web_control || self.wifi_server || self.firmware
    }
}

#[derive(Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct RecoveryController {
    delays: ReconnectDelays,
    uploads: UploadsInProgress,
    reconnecting_after_halt: bool,
    reset_confirmation_shown: bool,
    /// A reconnect timer is armed.
    reconnect_pending: bool,
    reload_after_reconnect: bool,
    /// The pending reconnect follows a self-update.
    update_reconnect: bool,
    /// Confirmation shown to the user and not yet answered.
    awaiting: Option<ConfirmationKind>,
}

impl RecoveryController {
    pub fn new(delays: ReconnectDelays) -> Self {
        Self {
            delays,
            uploads: UploadsInProgress::default(),
            reconnecting_after_halt: false,
            reset_confirmation_shown: false,
            reconnect_pending: false,
            reload_after_reconnect: false,
            update_reconnect: false,
            awaiting: None,
        }
    }

    pub fn set_upload_in_progress(&mut self, target: UploadTarget, active: bool) {
        self.uploads.set(target, active);
    }

    pub fn uploads(&self) -> UploadsInProgress {
        self.uploads
    }

    /// Feed the firmware state of the latest snapshot.
    pub fn on_status(&mut self, state: FirmwareState) -> RecoveryAction {
        match state {
            FirmwareState::Halted => self.on_halted(),
            FirmwareState::Updating => self.on_updating(),
            FirmwareState::Running => {
                self.on_running();
                RecoveryAction::None
            }
        }
    }

    fn on_halted(&mut self) -> RecoveryAction {
        if self.reconnect_pending {
            return RecoveryAction::None;
        }
        if !self.reconnecting_after_halt {
            return RecoveryAction::Schedule(self.schedule_halt());
        }
        if !self.reset_confirmation_shown {
            self.reset_confirmation_shown = true;
            self.awaiting = Some(ConfirmationKind::FirmwareReset);
            debug!("still halted after reconnect, offering firmware reset");
            return RecoveryAction::Confirm(ConfirmationKind::FirmwareReset);
        }
        RecoveryAction::None
    }

    fn on_updating(&mut self) -> RecoveryAction {
        if self.reconnect_pending {
            return RecoveryAction::None;
        }
        let uploads = self.uploads;
        if !uploads.any() {
            info!("firmware update in progress without a known upload");
            return RecoveryAction::Abandon;
        }

        let mut delay = Duration::ZERO;
        let mut kinds = Vec::new();
        if uploads.web_control {
            delay += self.delays.web_control;
            kinds.push(UpdateKind::WebControl);
        }
        if uploads.wifi_server {
            delay += self.delays.wifi_server;
            kinds.push(UpdateKind::WifiServer);
        }
        if uploads.firmware {
            delay += self.delays.firmware;
            kinds.push(UpdateKind::MainFirmware);
        }
        let kind = match kinds.as_slice() {
            [single] => *single,
            _ => UpdateKind::Combined,
        };

        self.reconnect_pending = true;
        self.update_reconnect = true;
        self.reload_after_reconnect = uploads.web_control;
        info!(%kind, ?delay, "updating firmware, reconnect scheduled");
        RecoveryAction::Schedule(ReconnectTask {
            reason: ReconnectReason::SelfUpdate(kind),
            delay,
            requires_confirmation: uploads.web_control,
        })
    }

    fn on_running(&mut self) {
        self.reconnecting_after_halt = false;
        self.reset_confirmation_shown = false;
        if self.awaiting == Some(ConfirmationKind::FirmwareReset) {
            self.awaiting = None;
        }
    }

    fn schedule_halt(&mut self) -> ReconnectTask {
        self.reconnecting_after_halt = true;
        self.reconnect_pending = true;
        info!(delay = ?self.delays.halted, "firmware halted, reconnect scheduled");
        ReconnectTask {
            reason: ReconnectReason::Halt,
            delay: self.delays.halted,
            requires_confirmation: false,
        }
    }

    /// Consume the outstanding confirmation if it is of `kind`. An answer
    /// to anything else is stale.
    pub fn take_confirmation(&mut self, kind: ConfirmationKind) -> bool {
        if self.awaiting == Some(kind) {
            self.awaiting = None;
            true
        } else {
            false
        }
    }

    /// The user accepted the firmware reset. `None` if a reconnect is
    /// already armed.
    pub fn confirm_reset(&mut self) -> Option<ReconnectTask> {
        (!self.reconnect_pending).then(|| self.schedule_halt())
    }

    /// The reconnect timer went off.
    pub fn timer_fired(&mut self) {
        self.reconnect_pending = false;
    }

    /// A session was (re-)established. Returns the confirmation to show,
    /// if the recovery that led here asks for one.
    pub fn on_reconnected(&mut self) -> Option<ConfirmationKind> {
        self.reset_confirmation_shown = false;
        self.awaiting = None;
        if std::mem::take(&mut self.update_reconnect) {
            self.uploads = UploadsInProgress::default();
        }
        if std::mem::take(&mut self.reload_after_reconnect) {
            self.awaiting = Some(ConfirmationKind::ReloadPage);
        }
        self.awaiting
    }

    /// Drop all recovery state except the upload flags, which belong to the
    /// upload subsystem.
    pub fn reset(&mut self) {
        *self = Self {
            uploads: self.uploads,
            ..Self::new(self.delays)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delays() -> ReconnectDelays {
        ReconnectDelays {
            halted: Duration::from_secs(5),
            web_control: Duration::from_secs(30),
            wifi_server: Duration::from_secs(45),
            firmware: Duration::from_secs(20),
        }
    }

    #[test]
    fn halt_then_halt_schedules_then_confirms_once() {
        let mut recovery = RecoveryController::new(delays());

        let action = recovery.on_status(FirmwareState::Halted);
        assert_eq!(
            action,
            RecoveryAction::Schedule(ReconnectTask {
                reason: ReconnectReason::Halt,
                delay: Duration::from_secs(5),
                requires_confirmation: false,
            })
        );

        // Overlapping timers are never armed.
        assert_eq!(recovery.on_status(FirmwareState::Halted), RecoveryAction::None);

        recovery.timer_fired();
        assert_eq!(recovery.on_reconnected(), None);

        assert_eq!(
            recovery.on_status(FirmwareState::Halted),
            RecoveryAction::Confirm(ConfirmationKind::FirmwareReset)
        );
        for _ in 0..3 {
            assert_eq!(recovery.on_status(FirmwareState::Halted), RecoveryAction::None);
        }
    }

    #[test]
    fn accepting_reset_schedules_halt_reconnect() {
        let mut recovery = RecoveryController::new(delays());
        recovery.on_status(FirmwareState::Halted);
        recovery.timer_fired();
        recovery.on_reconnected();
        recovery.on_status(FirmwareState::Halted);

        assert!(recovery.take_confirmation(ConfirmationKind::FirmwareReset));
        assert!(!recovery.take_confirmation(ConfirmationKind::FirmwareReset));
        let task = recovery.confirm_reset().expect("reconnect task");
        assert_eq!(task.reason, ReconnectReason::Halt);
        assert!(recovery.confirm_reset().is_none());
    }

    #[test]
    fn reset_forgets_outstanding_confirmation() {
        let mut recovery = RecoveryController::new(delays());
        recovery.on_status(FirmwareState::Halted);
        recovery.timer_fired();
        recovery.on_reconnected();
        recovery.on_status(FirmwareState::Halted);

        recovery.reset();
        assert!(!recovery.take_confirmation(ConfirmationKind::FirmwareReset));
    }

    #[test]
    fn recovered_board_withdraws_reset_offer() {
        let mut recovery = RecoveryController::new(delays());
        recovery.on_status(FirmwareState::Halted);
        recovery.timer_fired();
        recovery.on_reconnected();
        recovery.on_status(FirmwareState::Halted);

        recovery.on_status(FirmwareState::Running);
        assert!(!recovery.take_confirmation(ConfirmationKind::FirmwareReset));
    }

    #[test]
    fn running_clears_halt_flags() {
        let mut recovery = RecoveryController::new(delays());
        recovery.on_status(FirmwareState::Halted);
        recovery.timer_fired();
        recovery.on_status(FirmwareState::Running);

        assert!(matches!(
            recovery.on_status(FirmwareState::Halted),
            RecoveryAction::Schedule(_)
        ));
    }

    #[test]
    fn single_upload_uses_its_own_delay() {
        let mut recovery = RecoveryController::new(delays());
        recovery.set_upload_in_progress(UploadTarget::WifiServer, true);

        let RecoveryAction::Schedule(task) = recovery.on_status(FirmwareState::Updating) else {
            panic!("expected a reconnect");
        };
        assert_eq!(task.reason, ReconnectReason::SelfUpdate(UpdateKind::WifiServer));
        assert_eq!(task.delay, Duration::from_secs(45));
        assert!(!task.requires_confirmation);
    }

    #[test]
    fn update_reconnect_clears_upload_flags() {
        let mut recovery = RecoveryController::new(delays());
        recovery.set_upload_in_progress(UploadTarget::Firmware, true);
        assert!(matches!(
            recovery.on_status(FirmwareState::Updating),
            RecoveryAction::Schedule(_)
        ));

        recovery.timer_fired();
        assert_eq!(recovery.on_reconnected(), None);
        assert_eq!(recovery.uploads(), UploadsInProgress::default());

        // A later update the client did not start is not ours to wait for.
        assert_eq!(recovery.on_status(FirmwareState::Updating), RecoveryAction::Abandon);
    }

    #[test]
    fn combined_upload_sums_delays_and_asks_for_reload() {
        let mut recovery = RecoveryController::new(delays());
        recovery.set_upload_in_progress(UploadTarget::WebControl, true);
        recovery.set_upload_in_progress(UploadTarget::Firmware, true);

        let RecoveryAction::Schedule(task) = recovery.on_status(FirmwareState::Updating) else {
            panic!("expected a reconnect");
        };
        assert_eq!(task.reason, ReconnectReason::SelfUpdate(UpdateKind::Combined));
        assert_eq!(task.delay, Duration::from_secs(50));
        assert!(task.requires_confirmation);

        recovery.timer_fired();
        assert_eq!(recovery.on_reconnected(), Some(ConfirmationKind::ReloadPage));
        assert_eq!(recovery.uploads(), UploadsInProgress::default());
    }

    #[test]
    fn update_without_upload_abandons_session() {
        let mut recovery = RecoveryController::new(delays());
        assert_eq!(recovery.on_status(FirmwareState::Updating), RecoveryAction::Abandon);
    }
}
