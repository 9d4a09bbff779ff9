//! `From` implementations bridging `linebot_config` types to `linebot_core` types.

use std::time::Duration;

use crate::config::{
    BypassCfg, LineFollowCfg, ManualCfg, ModeCfg, RangingCfg, ReacquireTimeout, RobotConfig,
    TelemetryCfg,
};

// ── RangingCfg ───────────────────────────────────────────────────────────────

impl From<&linebot_config::RangingCfg> for RangingCfg {
    fn from(c: &linebot_config::RangingCfg) -> Self {
        Self {
            interval_ms: c.interval_ms,
            obstacle_threshold_cm: c.obstacle_threshold_cm,
            speed_of_sound_cm_per_us: c.speed_of_sound_cm_per_us,
            echo_timeout_ms: c.echo_timeout_ms,
        }
    }
}

// ── LineFollowCfg ────────────────────────────────────────────────────────────

impl From<&linebot_config::LineFollowCfg> for LineFollowCfg {
    fn from(c: &linebot_config::LineFollowCfg) -> Self {
        Self {
            fast_speed: c.fast_speed,
            floor_speed: c.floor_speed,
            turn_outer_speed: c.turn_outer_speed,
            turn_inner_start: c.turn_inner_start,
            turn_inner_floor: c.turn_inner_floor,
            spin_start: c.spin_start,
            spin_floor: c.spin_floor,
            ramp_delay_ms: c.ramp_delay_ms,
        }
    }
}

// ── BypassCfg ────────────────────────────────────────────────────────────────

impl From<linebot_config::ReacquireTimeout> for ReacquireTimeout {
    fn from(c: linebot_config::ReacquireTimeout) -> Self {
        match c {
            linebot_config::ReacquireTimeout::Resume => Self::Resume,
            linebot_config::ReacquireTimeout::Halt => Self::Halt,
        }
    }
}

impl From<&linebot_config::BypassCfg> for BypassCfg {
    fn from(c: &linebot_config::BypassCfg) -> Self {
        Self {
            pivot_speed: c.pivot_speed,
            sweep_speed: c.sweep_speed,
            cruise_speed: c.cruise_speed,
            reacquire_speed: c.reacquire_speed,
            edge_pivot_ms: c.edge_pivot_ms,
            settle_ms: c.settle_ms,
            scan_pivot_ms: c.scan_pivot_ms,
            sweep_step_ms: c.sweep_step_ms,
            sweep_mid_pause_ms: c.sweep_mid_pause_ms,
            snap_ms: c.snap_ms,
            reacquire_poll_ms: c.reacquire_poll_ms,
            reacquire_max_polls: c.reacquire_max_polls,
            on_reacquire_timeout: c.on_reacquire_timeout.into(),
        }
    }
}

// ── TelemetryCfg ─────────────────────────────────────────────────────────────

impl From<&linebot_config::TelemetryCfg> for TelemetryCfg {
    fn from(c: &linebot_config::TelemetryCfg) -> Self {
        Self {
            sample_interval_ms: c.sample_interval_ms,
            lsb_per_g: c.lsb_per_g,
            capacity: c.capacity,
            start_address: c.start_address,
            reserved_floor: c.reserved_floor,
            blink_ms: c.blink_ms,
            background: c.background,
        }
    }
}

// ── ManualCfg / ModeCfg ──────────────────────────────────────────────────────

impl From<&linebot_config::ManualCfg> for ManualCfg {
    fn from(c: &linebot_config::ManualCfg) -> Self {
        Self {
            axis_max: c.axis_max,
            max_speed: c.max_speed,
        }
    }
}

impl From<&linebot_config::ModeCfg> for ModeCfg {
    fn from(c: &linebot_config::ModeCfg) -> Self {
        Self {
            exclusive_toggle: c.exclusive_toggle,
        }
    }
}

// ── RobotConfig ──────────────────────────────────────────────────────────────

impl From<&linebot_config::Config> for RobotConfig {
    fn from(c: &linebot_config::Config) -> Self {
        Self {
            ranging: (&c.ranging).into(),
            line_follow: (&c.line_follow).into(),
            bypass: (&c.bypass).into(),
            telemetry: (&c.telemetry).into(),
            manual: (&c.manual).into(),
            mode: (&c.mode).into(),
            loop_period: Duration::from_millis(c.control.loop_period_ms),
        }
    }
}
