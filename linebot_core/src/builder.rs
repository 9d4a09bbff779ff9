//! Builder for [`Robot`].
//!
//! Every peripheral must be supplied; configuration sections default.
//! `try_build()` reports the first missing piece as a typed `BuildError`.

use std::sync::Arc;
use std::time::Duration;

use linebot_traits::clock::{Clock, MonotonicClock};
use linebot_traits::{Drive, Imu, Indicator, LineSensors, RangeFinder, RecordStore, Remote};

use crate::config::*;
use crate::error::{BuildError, Result};
use crate::kill_switch::KillSwitch;
use crate::manual::ManualDriveMapper;
use crate::mode::ModeArbiter;
use crate::navigation::Navigator;
use crate::ranging::RangingSampler;
use crate::robot::Robot;
use crate::sampler::{ImuSampler, SampledImu};
use crate::telemetry::TelemetryRecorder;

#[derive(Default)]
pub struct RobotBuilder {
    drive: Option<Box<dyn Drive>>,
    line: Option<Box<dyn LineSensors>>,
    ranger: Option<Box<dyn RangeFinder>>,
    imu: Option<Box<dyn Imu + Send>>,
    store: Option<Box<dyn RecordStore>>,
    remote: Option<Box<dyn Remote>>,
    indicator: Option<Box<dyn Indicator>>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
    config: RobotConfig,
}

/// Sampling periods without a fresh IMU reading before a stall is logged.
const STALL_PERIODS: u32 = 10;

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

impl RobotBuilder {
    pub fn with_drive(mut self, d: impl Drive + 'static) -> Self {
        self.drive = Some(Box::new(d));
        self
    }
    pub fn with_line_sensors(mut self, l: impl LineSensors + 'static) -> Self {
        self.line = Some(Box::new(l));
        self
    }
    pub fn with_range_finder(mut self, r: impl RangeFinder + 'static) -> Self {
        self.ranger = Some(Box::new(r));
        self
    }
    pub fn with_imu(mut self, i: impl Imu + Send + 'static) -> Self {
        self.imu = Some(Box::new(i));
        self
    }
    pub fn with_store(mut self, s: impl RecordStore + 'static) -> Self {
        self.store = Some(Box::new(s));
        self
    }
    pub fn with_remote(mut self, r: impl Remote + 'static) -> Self {
        self.remote = Some(Box::new(r));
        self
    }
    pub fn with_indicator(mut self, i: impl Indicator + 'static) -> Self {
        self.indicator = Some(Box::new(i));
        self
    }
    /// Clock for pacing and every timed step; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, c: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(c);
        self
    }
    pub fn with_config(mut self, c: RobotConfig) -> Self {
        self.config = c;
        self
    }
    pub fn with_ranging(mut self, c: RangingCfg) -> Self {
        self.config.ranging = c;
        self
    }
    pub fn with_line_follow(mut self, c: LineFollowCfg) -> Self {
        self.config.line_follow = c;
        self
    }
    pub fn with_bypass(mut self, c: BypassCfg) -> Self {
        self.config.bypass = c;
        self
    }
    pub fn with_telemetry(mut self, c: TelemetryCfg) -> Self {
        self.config.telemetry = c;
        self
    }
    pub fn with_manual(mut self, c: ManualCfg) -> Self {
        self.config.manual = c;
        self
    }
    pub fn with_mode(mut self, c: ModeCfg) -> Self {
        self.config.mode = c;
        self
    }
    pub fn with_loop_period(mut self, d: Duration) -> Self {
        self.config.loop_period = d;
        self
    }

    fn validate(cfg: &RobotConfig) -> Result<()> {
        let r = &cfg.ranging;
        if !(r.obstacle_threshold_cm.is_finite() && r.obstacle_threshold_cm > 0.0) {
            return Err(invalid("obstacle threshold must be > 0"));
        }
        if !(r.speed_of_sound_cm_per_us.is_finite() && r.speed_of_sound_cm_per_us > 0.0) {
            return Err(invalid("speed of sound must be > 0"));
        }
        let l = &cfg.line_follow;
        if l.floor_speed > l.fast_speed
            || l.turn_inner_floor > l.turn_inner_start
            || l.spin_floor > l.spin_start
        {
            return Err(invalid("ramp floor above its start speed"));
        }
        let t = &cfg.telemetry;
        if t.capacity == 0 {
            return Err(invalid("telemetry capacity must be >= 1"));
        }
        if !(t.lsb_per_g.is_finite() && t.lsb_per_g > 0.0) {
            return Err(invalid("lsb_per_g must be > 0"));
        }
        if !t.lowest_slot_address().is_some_and(|low| low >= t.reserved_floor) {
            return Err(invalid("telemetry slots run below the reserved floor"));
        }
        if cfg.manual.axis_max <= 0 {
            return Err(invalid("axis_max must be >= 1"));
        }
        if cfg.bypass.reacquire_max_polls == 0 {
            return Err(invalid("reacquire_max_polls must be >= 1"));
        }
        Ok(())
    }

    pub fn try_build(self) -> Result<Robot> {
        let drive = self.drive.ok_or(BuildError::MissingDrive)?;
        let line = self.line.ok_or(BuildError::MissingLineSensors)?;
        let ranger = self.ranger.ok_or(BuildError::MissingRangeFinder)?;
        let imu = self.imu.ok_or(BuildError::MissingImu)?;
        let mut store = self.store.ok_or(BuildError::MissingStore)?;
        let remote = self.remote.ok_or(BuildError::MissingRemote)?;
        let indicator = self.indicator.ok_or(BuildError::MissingIndicator)?;
        let cfg = self.config;
        Self::validate(&cfg)?;

        // Telemetry needs every slot to fit the store.
        let needed = usize::from(cfg.telemetry.start_address) + linebot_config::RECORD_STRIDE as usize;
        if needed > store.capacity_bytes() {
            return Err(invalid("telemetry start address beyond store capacity"));
        }

        let telemetry = TelemetryRecorder::resume(cfg.telemetry.clone(), &mut *store)?;

        let imu: Box<dyn Imu> = if cfg.telemetry.background {
            let period = Duration::from_millis(cfg.telemetry.sample_interval_ms);
            // Real-time pacing: the worker must not advance a virtual clock.
            let sampler = ImuSampler::spawn(imu, period, MonotonicClock::new());
            Box::new(SampledImu::new(sampler, period.saturating_mul(STALL_PERIODS)))
        } else {
            imu
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));

        Ok(Robot {
            drive,
            line,
            ranger,
            imu,
            store,
            remote,
            indicator,
            clock,
            kill: KillSwitch::new(),
            arbiter: ModeArbiter::new(&cfg.mode),
            ranging: RangingSampler::new(cfg.ranging.clone()),
            navigator: Navigator::new(
                cfg.line_follow.clone(),
                cfg.bypass.clone(),
                cfg.ranging.obstacle_threshold_cm,
            ),
            manual: ManualDriveMapper::new(&cfg.manual),
            telemetry,
            loop_period: cfg.loop_period,
            cycles: 0,
        })
    }
}
