//! Runtime configuration for the controller.
//!
//! These are the structs the controller components consume. They are
//! separate from the TOML-deserialized config in `linebot_config`.

use std::time::Duration;

/// Ultrasonic ranging.
#[derive(Debug, Clone)]
pub struct RangingCfg {
    /// Minimum time between rate-limited samples.
    pub interval_ms: u64,
    /// A distance below this is an obstacle.
    pub obstacle_threshold_cm: f32,
    pub speed_of_sound_cm_per_us: f32,
    /// Longest echo wait before a pulse counts as lost.
    pub echo_timeout_ms: u64,
}

impl Default for RangingCfg {
    fn default() -> Self {
        Self {
            interval_ms: 60,
            obstacle_threshold_cm: 15.0,
            speed_of_sound_cm_per_us: 0.0343,
            echo_timeout_ms: 30,
        }
    }
}

/// Speeds and easing for the line-follow table.
#[derive(Debug, Clone)]
pub struct LineFollowCfg {
    pub fast_speed: u8,
    pub floor_speed: u8,
    pub turn_outer_speed: u8,
    pub turn_inner_start: u8,
    pub turn_inner_floor: u8,
    pub spin_start: u8,
    pub spin_floor: u8,
    /// Pause taken for every ramp increment.
    pub ramp_delay_ms: u64,
}

impl Default for LineFollowCfg {
    fn default() -> Self {
        Self {
            fast_speed: 200,
            floor_speed: 120,
            turn_outer_speed: 255,
            turn_inner_start: 150,
            turn_inner_floor: 60,
            spin_start: 180,
            spin_floor: 100,
            ramp_delay_ms: 5,
        }
    }
}

/// What a bypass does when the line never comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReacquireTimeout {
    /// Stop, report, and hand control back to line following in `Lost`.
    #[default]
    Resume,
    /// Trip the kill latch.
    Halt,
}

/// Obstacle bypass timings and speeds.
#[derive(Debug, Clone)]
pub struct BypassCfg {
    pub pivot_speed: u8,
    pub sweep_speed: u8,
    pub cruise_speed: u8,
    pub reacquire_speed: u8,
    pub edge_pivot_ms: u64,
    pub settle_ms: u64,
    pub scan_pivot_ms: u64,
    pub sweep_step_ms: u64,
    pub sweep_mid_pause_ms: u64,
    pub snap_ms: u64,
    pub reacquire_poll_ms: u64,
    pub reacquire_max_polls: u32,
    pub on_reacquire_timeout: ReacquireTimeout,
}

impl Default for BypassCfg {
    fn default() -> Self {
        Self {
            pivot_speed: 160,
            sweep_speed: 140,
            cruise_speed: 170,
            reacquire_speed: 130,
            edge_pivot_ms: 450,
            settle_ms: 300,
            scan_pivot_ms: 350,
            sweep_step_ms: 120,
            sweep_mid_pause_ms: 200,
            snap_ms: 250,
            reacquire_poll_ms: 5,
            reacquire_max_polls: 2000,
            on_reacquire_timeout: ReacquireTimeout::Resume,
        }
    }
}

/// Accelerometer peak tracking and persistence.
#[derive(Debug, Clone)]
pub struct TelemetryCfg {
    pub sample_interval_ms: u64,
    /// Raw counts per g.
    pub lsb_per_g: f32,
    /// Records that fit below `start_address`.
    pub capacity: u16,
    /// Address of record #1; later records grow downwards.
    pub start_address: u16,
    /// No slot may start below this address.
    pub reserved_floor: u16,
    pub blink_ms: u64,
    /// Sample the IMU on a background thread.
    pub background: bool,
}

impl Default for TelemetryCfg {
    fn default() -> Self {
        Self {
            sample_interval_ms: 100,
            lsb_per_g: 16384.0,
            capacity: 10,
            start_address: 1000,
            reserved_floor: 0,
            blink_ms: 150,
            background: false,
        }
    }
}

impl TelemetryCfg {
    /// Address of the last slot, or None when the ring would run below 0.
    pub fn lowest_slot_address(&self) -> Option<u16> {
        let span = self
            .capacity
            .checked_sub(1)?
            .checked_mul(linebot_config::RECORD_STRIDE)?;
        self.start_address.checked_sub(span)
    }
}

/// Joystick to wheel mapping.
#[derive(Debug, Clone)]
pub struct ManualCfg {
    pub axis_max: i8,
    pub max_speed: u8,
}

impl Default for ManualCfg {
    fn default() -> Self {
        Self {
            axis_max: 7,
            max_speed: 255,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModeCfg {
    /// Save/report presses never toggle the mode.
    pub exclusive_toggle: bool,
}

/// Everything the controller needs, grouped.
#[derive(Debug, Clone)]
pub struct RobotConfig {
    pub ranging: RangingCfg,
    pub line_follow: LineFollowCfg,
    pub bypass: BypassCfg,
    pub telemetry: TelemetryCfg,
    pub manual: ManualCfg,
    pub mode: ModeCfg,
    /// Pause at the end of every control cycle.
    pub loop_period: Duration,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            ranging: RangingCfg::default(),
            line_follow: LineFollowCfg::default(),
            bypass: BypassCfg::default(),
            telemetry: TelemetryCfg::default(),
            manual: ManualCfg::default(),
            mode: ModeCfg::default(),
            loop_period: Duration::from_millis(10),
        }
    }
}
