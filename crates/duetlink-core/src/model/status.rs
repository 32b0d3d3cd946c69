// ── Machine and heater status codes ──

use serde::Serialize;
use strum::Display;

/// Machine status, decoded from the one-letter `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum MachineStatus {
    /// `F`: flashing new firmware.
    Updating,
    /// `H`: emergency stop.
    Halted,
    /// `D`: decelerating into a pause.
    Pausing,
    /// `S`: paused.
    Paused,
    /// `R`: resuming a paused print.
    Resuming,
    /// `P`
    Printing,
    /// `B`: running a macro or a move outside a print.
    Busy,
    /// `T`
    #[strum(serialize = "Changing tool")]
    ChangingTool,
    /// `I`
    Idle,
    /// A code this client does not know yet.
    #[strum(serialize = "Unknown")]
    Unknown(char),
}

impl MachineStatus {
    pub fn from_code(code: &str) -> Self {
        match code.chars().next() {
            Some('F') => Self::Updating,
            Some('H') => Self::Halted,
            Some('D') => Self::Pausing,
            Some('S') => Self::Paused,
            Some('R') => Self::Resuming,
            Some('P') => Self::Printing,
            Some('B') => Self::Busy,
            Some('T') => Self::ChangingTool,
            Some('I') => Self::Idle,
            Some(other) => Self::Unknown(other),
            None => Self::Unknown('?'),
        }
    }

    pub fn code(self) -> char {
        match self {
            Self::Updating => 'F',
            Self::Halted => 'H',
            Self::Pausing => 'D',
            Self::Paused => 'S',
            Self::Resuming => 'R',
            Self::Printing => 'P',
            Self::Busy => 'B',
            Self::ChangingTool => 'T',
            Self::Idle => 'I',
            Self::Unknown(c) => c,
        }
    }

    /// The `(printing, paused)` pair this status implies.
    ///
    /// A tool change keeps whatever printing flag was in effect before.
    /// Unknown codes return `None`: the caller keeps its current flags.
    pub fn activity(self, was_printing: bool) -> Option<(bool, bool)> {
        match self {
            Self::Pausing | Self::Paused | Self::Resuming => Some((true, true)),
            Self::Printing => Some((true, false)),
            Self::ChangingTool => Some((was_printing, false)),
            Self::Updating | Self::Halted | Self::Busy | Self::Idle => Some((false, false)),
            Self::Unknown(_) => None,
        }
    }
}

/// Heater state as reported in `temps.state` / `temps.heads.state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum HeaterState {
    Off,
    Standby,
    Active,
    Fault,
    Tuning,
    Unknown(u8),
}

impl From<u8> for HeaterState {
    fn from(code: u8) -> Self {
        match code {
            0 => Self::Off,
            1 => Self::Standby,
            2 => Self::Active,
            3 => Self::Fault,
            4 => Self::Tuning,
            other => Self::Unknown(other),
        }
    }
}
