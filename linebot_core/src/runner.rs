//! Drives `Robot::step` until a halt, a limit, or an external stop.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::error::Result;
use crate::robot::Robot;
use crate::status::CycleStatus;

/// Optional bounds on a run.
#[derive(Default)]
pub struct RunLimits {
    pub max_cycles: Option<u64>,
    /// Checked between cycles; returning true ends the run as `Finished`.
    pub until: Option<Box<dyn Fn() -> bool>>,
}

impl core::fmt::Debug for RunLimits {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunLimits")
            .field("max_cycles", &self.max_cycles)
            .field("until", &self.until.is_some())
            .finish()
    }
}

impl RunLimits {
    pub fn cycles(n: u64) -> Self {
        Self {
            max_cycles: Some(n),
            until: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Kill switch latched.
    Halted { cycles: u64 },
    CycleLimit { cycles: u64 },
    /// The shutdown flag was raised.
    Shutdown { cycles: u64 },
    /// The `until` condition became true.
    Finished { cycles: u64 },
}

impl RunOutcome {
    pub fn cycles(self) -> u64 {
        match self {
            RunOutcome::Halted { cycles }
            | RunOutcome::CycleLimit { cycles }
            | RunOutcome::Shutdown { cycles }
            | RunOutcome::Finished { cycles } => cycles,
        }
    }
}

/// Run the control loop. Motors are stopped before returning, also on error.
pub fn run(robot: &mut Robot, limits: RunLimits, shutdown: &AtomicBool) -> Result<RunOutcome> {
    info!(?limits, "control loop starting");
    robot.begin()?;

    let mut cycles = 0u64;
    let outcome = loop {
        if shutdown.load(Ordering::Relaxed) {
            break RunOutcome::Shutdown { cycles };
        }
        if limits.max_cycles.is_some_and(|max| cycles >= max) {
            break RunOutcome::CycleLimit { cycles };
        }
        if limits.until.as_ref().is_some_and(|f| f()) {
            break RunOutcome::Finished { cycles };
        }

        let status = match robot.step() {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, cycles, "cycle failed, stopping motors");
                robot.stop();
                return Err(e);
            }
        };
        cycles += 1;
        if status == CycleStatus::Halted {
            break RunOutcome::Halted { cycles };
        }
    };

    robot.stop();
    info!(?outcome, mode = ?robot.mode(), saved = robot.saved_count(), "control loop finished");
    Ok(outcome)
}
