//! Results of a single control cycle.

use crate::types::OperatingMode;

/// Public status of one `Robot::step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Keep going in the given mode.
    Running(OperatingMode),
    /// Kill latch is set; motors have been asked to stop.
    Halted,
}

/// How an autonomous step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maneuver {
    Continue,
    /// Aborted by the kill switch.
    Halted,
}
