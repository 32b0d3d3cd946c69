// ── Domain model ──
//
// Normalized, firmware-agnostic types produced from the raw rr_* payloads.

pub mod file_info;
pub mod machine;
pub mod snapshot;
pub mod status;

pub use file_info::FileInfo;
pub use machine::{MachineInfo, ProbeParams, Tool, Voltage};
pub use snapshot::{
    Beep, Coordinates, ExtendedStatus, ExtraSensor, HeadReading, HeaterReadings, HeaterZone,
    MessageBox, Output, Params, PrintStatus, ScannerStatus, Sensors, StatusSnapshot, Temperatures,
    TimesLeft, ToolTargets,
};
pub use status::{HeaterState, MachineStatus};
