//! Peripheral implementations for the linebot controller.
//!
//! Simulated peripherals and record stores are always available; the GPIO
//! drivers need the `hardware` feature on Linux.

pub mod eeprom;
pub mod error;
pub mod sim;
pub mod util;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

pub use eeprom::{FileEeprom, MemoryEeprom, RECORD_BYTES};
pub use error::HwError;
pub use sim::{
    DriveCommand, DriveLog, Frame, ScriptedImu, ScriptedLineSensors, ScriptedRangeFinder,
    ScriptedRemote, SimulatedDrive, SimulatedIndicator, TextLog, Timeline, TimelinePort,
};
