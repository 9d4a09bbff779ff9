//! Assemble a robot from config and the selected peripherals, then run it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use linebot_config::{Config, ScenarioRow};
use linebot_core::config::{RobotConfig, TelemetryCfg};
use linebot_core::hw_error::map_hw_error;
use linebot_core::telemetry::TelemetryRecorder;
use linebot_core::{Robot, RobotBuilder, RunLimits, RunOutcome};
use linebot_hardware::{FileEeprom, Frame, MemoryEeprom, Timeline, TimelinePort};
use linebot_traits::{Clock, MonotonicClock, RecordStore, VirtualClock};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub scenario: Option<PathBuf>,
    pub max_cycles: Option<u64>,
    pub virtual_time: bool,
    pub json: bool,
}

pub fn frames_from(rows: &[ScenarioRow]) -> Vec<Frame> {
    rows.iter()
        .map(|r| Frame {
            t_ms: r.t_ms,
            button: r.button,
            steer: r.steer,
            throttle: r.throttle,
            left: r.left != 0,
            right: r.right != 0,
            echo_us: r.echo_us,
            accel: [r.ax, r.ay, r.az],
        })
        .collect()
}

fn clock_for(virtual_time: bool) -> Arc<dyn Clock + Send + Sync> {
    if virtual_time {
        Arc::new(VirtualClock::new())
    } else {
        Arc::new(MonotonicClock::new())
    }
}

fn storage_err(e: linebot_hardware::HwError, path: &Path) -> eyre::Report {
    eyre::Report::new(map_hw_error(&e)).wrap_err(format!("opening record store {}", path.display()))
}

fn open_store(cfg: &Config) -> eyre::Result<Box<dyn RecordStore>> {
    match cfg.storage.path.as_deref() {
        Some(p) => {
            let path = Path::new(p);
            let store = FileEeprom::open(path, cfg.storage.size_bytes).map_err(|e| storage_err(e, path))?;
            info!(path = %store.path().display(), "telemetry persists to file");
            Ok(Box::new(store))
        }
        None => Ok(Box::new(MemoryEeprom::new(cfg.storage.size_bytes))),
    }
}

/// Drive, line sensors, ranger and indicator: GPIO on the target board,
/// otherwise the timeline port and simulated actuators.
#[cfg(all(feature = "hardware", target_os = "linux"))]
fn with_actuators(b: RobotBuilder, cfg: &Config, _port: &TimelinePort) -> eyre::Result<RobotBuilder> {
    use linebot_hardware::gpio::{ChannelPins, GpioIndicator, Hcsr04, IrLineSensors, L298nDrive};

    let pins = cfg
        .pins
        .as_ref()
        .ok_or_else(|| eyre::eyre!("[pins] section missing; required with the hardware backend"))?;
    let hw = |e: linebot_hardware::HwError| eyre::Report::new(map_hw_error(&e));
    let drive = L298nDrive::new(
        ChannelPins {
            enable: pins.motor_left_en,
            in_a: pins.motor_left_a,
            in_b: pins.motor_left_b,
        },
        ChannelPins {
            enable: pins.motor_right_en,
            in_a: pins.motor_right_a,
            in_b: pins.motor_right_b,
        },
        pins.pwm_hz,
    )
    .map_err(hw)?;
    let line = IrLineSensors::new(pins.line_left, pins.line_right, pins.line_active_low).map_err(hw)?;
    let ranger = Hcsr04::new(pins.ranger_trig, pins.ranger_echo).map_err(hw)?;
    let led = GpioIndicator::new(pins.led).map_err(hw)?;
    info!("hardware backend: GPIO drive, line sensors, ranger and LED");
    Ok(b.with_drive(drive)
        .with_line_sensors(line)
        .with_range_finder(ranger)
        .with_indicator(led))
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
fn with_actuators(b: RobotBuilder, _cfg: &Config, port: &TimelinePort) -> eyre::Result<RobotBuilder> {
    use linebot_hardware::{SimulatedDrive, SimulatedIndicator};

    Ok(b.with_drive(SimulatedDrive::new())
        .with_line_sensors(port.clone())
        .with_range_finder(port.clone())
        .with_indicator(SimulatedIndicator::new()))
}

fn build(
    cfg: &Config,
    port: &TimelinePort,
    store: Box<dyn RecordStore>,
    clock: Arc<dyn Clock + Send + Sync>,
) -> eyre::Result<Robot> {
    let b = RobotBuilder::default()
        .with_config(RobotConfig::from(cfg))
        .with_remote(port.clone())
        .with_imu(port.clone())
        .with_store(store)
        .with_clock(clock);
    with_actuators(b, cfg, port)?.try_build()
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub mode: linebot_core::OperatingMode,
    pub saved: u16,
}

impl RunSummary {
    fn outcome_name(&self) -> &'static str {
        match self.outcome {
            RunOutcome::Halted { .. } => "halted",
            RunOutcome::CycleLimit { .. } => "cycle_limit",
            RunOutcome::Shutdown { .. } => "shutdown",
            RunOutcome::Finished { .. } => "finished",
        }
    }

    pub fn print(&self, json: bool) {
        if json {
            let line = serde_json::json!({
                "outcome": self.outcome_name(),
                "cycles": self.outcome.cycles(),
                "mode": format!("{:?}", self.mode).to_ascii_lowercase(),
                "saved": self.saved,
            });
            println!("{line}");
        } else {
            println!(
                "run ended: {} after {} cycles (mode {:?}, {} records saved)",
                self.outcome_name(),
                self.outcome.cycles(),
                self.mode,
                self.saved
            );
        }
    }
}

pub fn run_robot(cfg: &Config, args: &RunArgs, shutdown: &AtomicBool) -> eyre::Result<RunSummary> {
    let frames = match &args.scenario {
        Some(path) => frames_from(&linebot_config::load_scenario_csv(path)?),
        None => Vec::new(),
    };
    let scripted = !frames.is_empty();
    let clock = clock_for(args.virtual_time);
    let timeline = Timeline::new(frames, Arc::clone(&clock));
    let port = TimelinePort::new(Arc::clone(&timeline)).echo_stdout(!args.json);

    let mut robot = build(cfg, &port, open_store(cfg)?, clock).wrap_err("building robot")?;

    let limits = RunLimits {
        max_cycles: args.max_cycles,
        until: scripted.then(|| {
            let tl = Arc::clone(&timeline);
            Box::new(move || tl.finished()) as Box<dyn Fn() -> bool>
        }),
    };
    info!(scripted, virtual_time = args.virtual_time, "robot assembled");
    let outcome = linebot_core::runner::run(&mut robot, limits, shutdown)?;
    Ok(RunSummary {
        outcome,
        mode: robot.mode(),
        saved: robot.saved_count(),
    })
}

/// Build on simulated peripherals with an in-memory store and run one cycle.
pub fn self_check(cfg: &Config) -> eyre::Result<RunOutcome> {
    let clock: Arc<dyn Clock + Send + Sync> = Arc::new(VirtualClock::new());
    let port = TimelinePort::new(Timeline::new(Vec::new(), Arc::clone(&clock)));
    let store = Box::new(MemoryEeprom::new(cfg.storage.size_bytes));
    let mut robot = build(cfg, &port, store, clock).wrap_err("building robot")?;
    linebot_core::runner::run(&mut robot, RunLimits::cycles(1), &AtomicBool::new(false))
}

/// Print the records persisted in `storage.path`, oldest first.
pub fn report(cfg: &Config, count: Option<u16>, json: bool) -> eyre::Result<usize> {
    let Some(p) = cfg.storage.path.as_deref() else {
        eyre::bail!("storage.path is not set; records only persist to a file-backed store");
    };
    let path = Path::new(p);
    let mut store = FileEeprom::open(path, cfg.storage.size_bytes).map_err(|e| storage_err(e, path))?;
    let tcfg = TelemetryCfg::from(&cfg.telemetry);
    let limit = count.unwrap_or(tcfg.capacity);
    let records = TelemetryRecorder::scan(&tcfg, &mut store, limit)?;

    if json {
        let list: Vec<_> = records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let [x, y, z] = r.to_array();
                serde_json::json!({ "index": i + 1, "x": x, "y": y, "z": z })
            })
            .collect();
        println!("{}", serde_json::json!({ "records": list }));
    } else if records.is_empty() {
        println!("nothing saved yet");
    } else {
        for (i, r) in records.iter().enumerate() {
            println!("#{}: {r}", i + 1);
        }
    }
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_rows_become_frames() {
        let rows = [ScenarioRow {
            t_ms: 40,
            button: Some(4),
            steer: -3,
            throttle: 7,
            left: 1,
            right: 0,
            echo_us: 900,
            ax: 1,
            ay: -2,
            az: 3,
        }];
        let f = frames_from(&rows)[0];
        assert_eq!(f.t_ms, 40);
        assert_eq!(f.button, Some(4));
        assert!(f.left && !f.right);
        assert_eq!(f.accel, [1, -2, 3]);
    }

    #[test]
    fn self_check_runs_one_cycle_on_defaults() {
        let outcome = self_check(&Config::default()).unwrap();
        assert_eq!(outcome, RunOutcome::CycleLimit { cycles: 1 });
    }
}
