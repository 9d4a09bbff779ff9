#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and scenario parsing for the line-following robot.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//! - The scenario CSV loader enforces headers and ordering so simulated runs
//!   can be replayed deterministically.
use serde::Deserialize;

/// Fixed size of one persisted telemetry record in bytes (3 x f64).
pub const RECORD_STRIDE: u16 = 24;

/// BCM pin assignment; only read when the GPIO backend is compiled in.
#[derive(Debug, Deserialize, Clone)]
pub struct Pins {
    pub motor_left_en: u8,
    pub motor_left_a: u8,
    pub motor_left_b: u8,
    pub motor_right_en: u8,
    pub motor_right_a: u8,
    pub motor_right_b: u8,
    pub line_left: u8,
    pub line_right: u8,
    /// Sensors pull low over the line when true
    #[serde(default = "default_true")]
    pub line_active_low: bool,
    pub ranger_trig: u8,
    pub ranger_echo: u8,
    pub led: u8,
    /// Software PWM frequency on the H-bridge enable pins
    #[serde(default = "default_pwm_hz")]
    pub pwm_hz: f64,
}

fn default_true() -> bool {
    true
}

fn default_pwm_hz() -> f64 {
    1000.0
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RangingCfg {
    /// Minimum spacing between two rate-limited samples
    pub interval_ms: u64,
    /// Anything closer than this is an obstacle
    pub obstacle_threshold_cm: f32,
    pub speed_of_sound_cm_per_us: f32,
    /// Max wait for the echo edge of one pulse
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LineFollowCfg {
    pub fast_speed: u8,
    pub floor_speed: u8,
    pub turn_outer_speed: u8,
    pub turn_inner_start: u8,
    pub turn_inner_floor: u8,
    pub spin_start: u8,
    pub spin_floor: u8,
    /// Pause injected by every ramp increment
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

/// What the bypass does when the line never comes back.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReacquireTimeout {
    /// Stop, notify, and fall back to line following
    #[default]
    Resume,
    /// Stop, notify, and latch the kill switch
    Halt,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryCfg {
    pub sample_interval_ms: u64,
    /// Raw accelerometer counts per g (16384 for a +-2 g range)
    pub lsb_per_g: f32,
    /// Number of record slots
    pub capacity: u16,
    /// Address of the oldest slot; later slots count down by 24 bytes
    pub start_address: u16,
    /// Lowest address a slot may start at
    pub reserved_floor: u16,
    pub blink_ms: u64,
    /// Sample the IMU on a background thread
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageCfg {
    /// Image file; in-memory storage when absent
    pub path: Option<String>,
    pub size_bytes: usize,
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            path: None,
            size_bytes: 1024,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ManualCfg {
    /// Joystick axes report -axis_max..=axis_max
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

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ModeCfg {
    /// Only dedicated mode buttons toggle; save/report presses never do
    pub exclusive_toggle: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControlCfg {
    /// Pacing sleep at the end of every cycle
    pub loop_period_ms: u64,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self { loop_period_ms: 10 }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub pins: Option<Pins>,
    #[serde(default)]
    pub ranging: RangingCfg,
    #[serde(default)]
    pub line_follow: LineFollowCfg,
    #[serde(default)]
    pub bypass: BypassCfg,
    #[serde(default)]
    pub telemetry: TelemetryCfg,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub manual: ManualCfg,
    #[serde(default)]
    pub mode: ModeCfg,
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl TelemetryCfg {
    /// Address of the newest slot, or None when the ring would underflow.
    pub fn lowest_slot_address(&self) -> Option<u16> {
        let span = self.capacity.checked_sub(1)?.checked_mul(RECORD_STRIDE)?;
        self.start_address.checked_sub(span)
    }
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Ranging
        if self.ranging.interval_ms == 0 {
            eyre::bail!("ranging.interval_ms must be >= 1");
        }
        if !self.ranging.obstacle_threshold_cm.is_finite()
            || self.ranging.obstacle_threshold_cm <= 0.0
        {
            eyre::bail!("ranging.obstacle_threshold_cm must be a positive number");
        }
        if !self.ranging.speed_of_sound_cm_per_us.is_finite()
            || self.ranging.speed_of_sound_cm_per_us <= 0.0
        {
            eyre::bail!("ranging.speed_of_sound_cm_per_us must be a positive number");
        }
        if self.ranging.echo_timeout_ms == 0 {
            eyre::bail!("ranging.echo_timeout_ms must be >= 1");
        }

        // Line follow
        let lf = &self.line_follow;
        if lf.floor_speed > lf.fast_speed {
            eyre::bail!("line_follow.floor_speed must be <= line_follow.fast_speed");
        }
        if lf.turn_inner_floor > lf.turn_inner_start {
            eyre::bail!("line_follow.turn_inner_floor must be <= line_follow.turn_inner_start");
        }
        if lf.spin_floor > lf.spin_start {
            eyre::bail!("line_follow.spin_floor must be <= line_follow.spin_start");
        }
        if lf.ramp_delay_ms > 1000 {
            eyre::bail!("line_follow.ramp_delay_ms is unreasonably large (>1s)");
        }

        // Bypass
        let bp = &self.bypass;
        if bp.pivot_speed == 0 || bp.sweep_speed == 0 || bp.cruise_speed == 0 {
            eyre::bail!("bypass speeds must be > 0");
        }
        if bp.reacquire_speed == 0 {
            eyre::bail!("bypass.reacquire_speed must be > 0");
        }
        if bp.reacquire_max_polls == 0 {
            eyre::bail!("bypass.reacquire_max_polls must be >= 1");
        }
        if bp.reacquire_poll_ms == 0 {
            eyre::bail!("bypass.reacquire_poll_ms must be >= 1");
        }

        // Telemetry
        let t = &self.telemetry;
        if t.sample_interval_ms == 0 {
            eyre::bail!("telemetry.sample_interval_ms must be >= 1");
        }
        if !t.lsb_per_g.is_finite() || t.lsb_per_g <= 0.0 {
            eyre::bail!("telemetry.lsb_per_g must be a positive number");
        }
        if t.capacity == 0 {
            eyre::bail!("telemetry.capacity must be >= 1");
        }
        match t.lowest_slot_address() {
            Some(low) if low >= t.reserved_floor => {}
            _ => eyre::bail!(
                "telemetry.capacity of {} records does not fit between start_address {} and reserved_floor {}",
                t.capacity,
                t.start_address,
                t.reserved_floor
            ),
        }
        let end = usize::from(t.start_address) + usize::from(RECORD_STRIDE);
        if end > self.storage.size_bytes {
            eyre::bail!(
                "telemetry.start_address {} leaves no room for a record in storage.size_bytes {}",
                t.start_address,
                self.storage.size_bytes
            );
        }

        // Manual
        if self.manual.axis_max <= 0 {
            eyre::bail!("manual.axis_max must be >= 1");
        }

        // Control
        if self.control.loop_period_ms > 1000 {
            eyre::bail!("control.loop_period_ms is unreasonably large (>1s)");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

/// One row of a simulation scenario.
///
/// Expected headers:
/// t_ms,button,steer,throttle,left,right,echo_us,ax,ay,az
///
/// `button` is empty when nothing is pressed; `left`/`right` are 0 or 1.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct ScenarioRow {
    pub t_ms: u64,
    pub button: Option<u8>,
    pub steer: i8,
    pub throttle: i8,
    pub left: u8,
    pub right: u8,
    pub echo_us: u32,
    pub ax: i16,
    pub ay: i16,
    pub az: i16,
}

const SCENARIO_HEADERS: [&str; 10] = [
    "t_ms", "button", "steer", "throttle", "left", "right", "echo_us", "ax", "ay", "az",
];

/// Parse scenario rows from any reader.
pub fn read_scenario<R: std::io::Read>(reader: R) -> eyre::Result<Vec<ScenarioRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read scenario headers: {}", e))?
        .clone();
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != SCENARIO_HEADERS {
        eyre::bail!(
            "scenario CSV must have headers '{}', got: {}",
            SCENARIO_HEADERS.join(","),
            actual.join(",")
        );
    }

    let mut rows: Vec<ScenarioRow> = Vec::new();
    for (idx, rec) in rdr.deserialize::<ScenarioRow>().enumerate() {
        let line = idx + 2;
        let row = rec.map_err(|e| eyre::eyre!("invalid scenario row {}: {}", line, e))?;
        if row.left > 1 || row.right > 1 {
            eyre::bail!("scenario row {}: left/right must be 0 or 1", line);
        }
        if let Some(prev) = rows.last()
            && row.t_ms < prev.t_ms
        {
            eyre::bail!(
                "scenario row {}: t_ms {} goes backwards (previous {})",
                line,
                row.t_ms,
                prev.t_ms
            );
        }
        rows.push(row);
    }
    if rows.is_empty() {
        eyre::bail!("scenario has no rows");
    }
    Ok(rows)
}

pub fn load_scenario_csv(path: &std::path::Path) -> eyre::Result<Vec<ScenarioRow>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open scenario CSV {:?}: {}", path, e))?;
    read_scenario(file)
}
