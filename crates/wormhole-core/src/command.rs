//! Control commands understood by the replayer firmware.
//!
//! A command is the `ctrl` sequence followed by one ASCII digit. The replayer
//! watches its serial input for it alongside the frame magic.

use std::fmt;
use std::str::FromStr;

use crate::constants::CONTROL;

/// Radio power command sent to a replayer device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioCommand {
    On,
    Off,
}

impl RadioCommand {
    /// Argument byte following the control sequence.
    pub fn code(self) -> u8 {
        match self {
            RadioCommand::On => b'1',
            RadioCommand::Off => b'0',
        }
    }

    /// Encode as `ctrl` + code.
    pub fn encode(self) -> [u8; 5] {
        [CONTROL[0], CONTROL[1], CONTROL[2], CONTROL[3], self.code()]
    }
}

impl fmt::Display for RadioCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioCommand::On => write!(f, "on"),
            RadioCommand::Off => write!(f, "off"),
        }
    }
}

impl FromStr for RadioCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" | "1" => Ok(RadioCommand::On),
            "off" | "0" => Ok(RadioCommand::Off),
            other => Err(format!("unknown radio command: {other}")),
        }
    }
}
