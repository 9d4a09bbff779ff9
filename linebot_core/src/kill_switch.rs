//! Latched emergency stop driven by the remote's kill button.
//!
//! Once tripped the latch never clears; only a reset (new process) runs
//! the motors again.

use linebot_traits::{Drive, Remote};

use crate::error::Result;
use crate::hw_error::HwContext;
use crate::types::Button;

pub const KILL_MESSAGE: &str = "KILL: halted, reset required";

#[derive(Debug, Default)]
pub struct KillSwitch {
    latched: bool,
}

impl KillSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_latched(&self) -> bool {
        self.latched
    }

    /// Poll the remote once. Returns true when the robot must halt, either
    /// because the latch was already set or the kill button is pressed now.
    pub fn check_for_abort(&mut self, remote: &mut dyn Remote, drive: &mut dyn Drive) -> Result<bool> {
        if self.latched {
            return Ok(true);
        }
        let button = Button::decode(remote.button_code().hw("polling remote")?);
        if button == Button::Kill {
            self.trip(remote, drive);
            return Ok(true);
        }
        Ok(false)
    }

    /// Set the latch, stop both motors and tell the operator. Best effort:
    /// an actuator failure is logged, the latch stays set.
    pub fn trip(&mut self, remote: &mut dyn Remote, drive: &mut dyn Drive) {
        if let Err(e) = drive.stop_all() {
            tracing::warn!(error = %e, "motor stop failed while halting");
        }
        if self.latched {
            return;
        }
        self.latched = true;
        tracing::error!("kill switch tripped");
        if let Err(e) = remote.send_text(KILL_MESSAGE) {
            tracing::warn!(error = %e, "kill notice not delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linebot_hardware::{DriveCommand, ScriptedRemote, SimulatedDrive};

    #[test]
    fn latches_on_kill_code() {
        let mut remote = ScriptedRemote::new([None, Some(0), None]);
        let sent = remote.sent();
        let mut drive = SimulatedDrive::new();
        let log = drive.log();
        let mut k = KillSwitch::new();

        assert!(!k.check_for_abort(&mut remote, &mut drive).unwrap());
        assert!(k.check_for_abort(&mut remote, &mut drive).unwrap());
        // released button does not clear the latch
        assert!(k.check_for_abort(&mut remote, &mut drive).unwrap());
        assert!(k.is_latched());
        assert_eq!(sent.snapshot(), vec![KILL_MESSAGE.to_string()]);
        assert_eq!(log.last(), Some(DriveCommand::StopAll));
    }

    #[test]
    fn repeated_trip_notifies_once() {
        let mut remote = ScriptedRemote::idle();
        let sent = remote.sent();
        let mut drive = SimulatedDrive::new();
        let mut k = KillSwitch::new();
        k.trip(&mut remote, &mut drive);
        k.trip(&mut remote, &mut drive);
        assert_eq!(sent.len(), 1);
    }
}
