//! Session and status layer between `duetlink-api` and UI consumers.
//!
//! This crate owns the connection lifecycle and the interpretation of
//! everything a RepRapFirmware board reports:
//!
//! - **[`Controller`]**: central facade. [`connect()`](Controller::connect)
//!   opens an `rr_connect` session and starts the status poller;
//!   [`Controller::oneshot()`](Controller::oneshot) connects without polling
//!   for single CLI invocations.
//!
//! - **[`Reconciler`]**: diffs every status snapshot against the previous
//!   one and turns the differences into [`ControllerEvent`]s.
//!
//! - **[`RecoveryController`]**: reacts to emergency stops and firmware
//!   self-updates by scheduling reconnects.
//!
//! - **Domain model** ([`model`]): normalized snapshot, machine properties
//!   and file metadata, independent of the raw `rr_*` payload shapes.

pub mod config;
pub mod console;
pub mod controller;
pub mod convert;
pub mod error;
pub mod event;
pub mod model;
pub mod poller;
pub mod progress;
pub mod reconciler;
pub mod recovery;
pub mod temperature;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ControllerConfig, DEFAULT_PASSWORD, TlsVerification};
pub use console::{ConsoleEntry, ConsoleStyle};
pub use controller::{ConnectionState, Controller};
pub use error::CoreError;
pub use event::{ControllerEvent, SnapshotDelta};
pub use progress::{LayerEntry, PrintProgress, PrintTracker, ProgressSource};
pub use reconciler::{Reconciler, Reconciliation};
pub use recovery::{
    ConfirmationKind, FirmwareState, ReconnectReason, RecoveryController, UpdateKind, UploadTarget,
};
pub use temperature::{HeatersInUse, TemperatureSample};

pub use model::{
    FileInfo, HeaterReadings, HeaterState, MachineInfo, MachineStatus, StatusSnapshot, Tool,
};

// The status level is part of the public polling surface.
pub use duetlink_api::StatusLevel;
