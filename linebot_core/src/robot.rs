//! The control cycle.

use std::sync::Arc;
use std::time::Duration;

use linebot_traits::clock::Clock;
use linebot_traits::{Drive, Imu, Indicator, LineSensors, RangeFinder, RecordStore, Remote};

use crate::builder::RobotBuilder;
use crate::error::Result;
use crate::hw_error::HwContext;
use crate::kill_switch::KillSwitch;
use crate::manual::ManualDriveMapper;
use crate::mode::ModeArbiter;
use crate::navigation::{NavIo, Navigator};
use crate::ranging::RangingSampler;
use crate::status::{CycleStatus, Maneuver};
use crate::telemetry::{TelemetryIo, TelemetryRecorder};
use crate::types::{Button, LineReading, NavState, OperatingMode, PeakG};

pub struct Robot {
    pub(crate) drive: Box<dyn Drive>,
    pub(crate) line: Box<dyn LineSensors>,
    pub(crate) ranger: Box<dyn RangeFinder>,
    pub(crate) imu: Box<dyn Imu>,
    pub(crate) store: Box<dyn RecordStore>,
    pub(crate) remote: Box<dyn Remote>,
    pub(crate) indicator: Box<dyn Indicator>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) kill: KillSwitch,
    pub(crate) arbiter: ModeArbiter,
    pub(crate) ranging: RangingSampler,
    pub(crate) navigator: Navigator,
    pub(crate) manual: ManualDriveMapper,
    pub(crate) telemetry: TelemetryRecorder,
    pub(crate) loop_period: Duration,
    pub(crate) cycles: u64,
}

impl core::fmt::Debug for Robot {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Robot")
            .field("mode", &self.mode())
            .field("nav_state", &self.nav_state())
            .field("ramp", &self.ramp())
            .field("saved", &self.saved_count())
            .field("halted", &self.is_halted())
            .finish()
    }
}

impl Robot {
    pub fn builder() -> RobotBuilder {
        RobotBuilder::default()
    }

    pub fn mode(&self) -> OperatingMode {
        self.arbiter.mode()
    }

    pub fn nav_state(&self) -> NavState {
        self.navigator.state()
    }

    pub fn ramp(&self) -> u8 {
        self.navigator.ramp()
    }

    pub fn peak(&self) -> PeakG {
        self.telemetry.peak()
    }

    pub fn saved_count(&self) -> u16 {
        self.telemetry.saved_count()
    }

    pub fn is_halted(&self) -> bool {
        self.kill.is_latched()
    }

    /// Completed `Running` cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    /// Records saved since boot, read back from the store.
    pub fn records(&mut self) -> Result<Vec<PeakG>> {
        self.telemetry.records(&mut *self.store)
    }

    /// Put the actuators in the power-on state: motors stopped, indicator
    /// showing the current mode.
    pub fn begin(&mut self) -> Result<()> {
        self.drive.stop_all().hw("stopping motors")?;
        self.indicator
            .set(self.mode().indicator_level())
            .hw("setting mode indicator")
    }

    /// Stop both motors (best-effort).
    pub fn stop(&mut self) {
        if let Err(e) = self.drive.stop_all() {
            tracing::warn!(error = %e, "motor stop failed");
        }
    }

    /// One control cycle.
    pub fn step(&mut self) -> Result<CycleStatus> {
        if self.kill.is_latched() {
            self.stop();
            return Ok(CycleStatus::Halted);
        }

        let button = Button::decode(self.remote.button_code().hw("polling remote")?);
        if button == Button::Kill {
            self.kill.trip(&mut *self.remote, &mut *self.drive);
            return Ok(CycleStatus::Halted);
        }

        let mode = self
            .arbiter
            .update(button, &mut *self.drive, &mut *self.indicator)?;

        match mode {
            OperatingMode::Manual => {
                let steering = self.remote.steering_axis().hw("reading steering axis")?;
                let throttle = self.remote.throttle_axis().hw("reading throttle axis")?;
                self.manual.drive(steering, throttle, &mut *self.drive)?;
            }
            OperatingMode::Autonomous => {
                let threshold = self.ranging.threshold();
                let distance = self
                    .ranging
                    .sample(&mut *self.ranger, &*self.clock)?
                    .or_sentinel(threshold);
                let line = LineReading::from(self.line.read().hw("reading line sensors")?);
                let mut io = NavIo {
                    drive: &mut *self.drive,
                    line: &mut *self.line,
                    ranger: &mut *self.ranger,
                    remote: &mut *self.remote,
                    clock: &*self.clock,
                    ranging: &mut self.ranging,
                    kill: &mut self.kill,
                };
                if self.navigator.autonomous_step(line, distance, &mut io)? == Maneuver::Halted {
                    return Ok(CycleStatus::Halted);
                }
            }
        }

        let mut io = TelemetryIo {
            imu: &mut *self.imu,
            store: &mut *self.store,
            remote: &mut *self.remote,
            indicator: &mut *self.indicator,
            clock: &*self.clock,
        };
        self.telemetry.tick(button, mode, &mut io)?;

        self.cycles += 1;
        self.clock.sleep(self.loop_period);
        Ok(CycleStatus::Running(mode))
    }
}
