use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use linebot_core::kill_switch::KILL_MESSAGE;
use linebot_core::runner::run;
use linebot_core::{
    BuildError, CycleStatus, NavState, OperatingMode, Robot, RobotBuilder, RunLimits, RunOutcome,
    TelemetryCfg,
};
use linebot_hardware::{
    DriveCommand, DriveLog, MemoryEeprom, ScriptedImu, ScriptedLineSensors, ScriptedRangeFinder,
    ScriptedRemote, SimulatedDrive, SimulatedIndicator, TextLog,
};
use linebot_traits::{Direction, HwResult, Imu, RecordStore, VirtualClock};
use rstest::rstest;

const TOGGLE: Option<u8> = Some(1);
const KILL: Option<u8> = Some(0);

struct Handles {
    drive: DriveLog,
    sent: TextLog,
    clock: Arc<VirtualClock>,
}

fn robot(buttons: Vec<Option<u8>>, remote_axes: (i8, i8), echo_cm: f32) -> (Robot, Handles) {
    let drive = SimulatedDrive::new();
    let remote = ScriptedRemote::new(buttons).with_axes(remote_axes.0, remote_axes.1);
    let clock = Arc::new(VirtualClock::new());
    let handles = Handles {
        drive: drive.log(),
        sent: remote.sent(),
        clock: clock.clone(),
    };
    let robot = Robot::builder()
        .with_drive(drive)
        .with_line_sensors(ScriptedLineSensors::clear())
        .with_range_finder(ScriptedRangeFinder::constant_cm(echo_cm))
        .with_imu(ScriptedImu::new([[0, 0, 16384]]))
        .with_store(MemoryEeprom::new(1024))
        .with_remote(remote)
        .with_indicator(SimulatedIndicator::new())
        .with_clock(clock)
        .try_build()
        .unwrap();
    (robot, handles)
}

fn missing(b: RobotBuilder) -> BuildError {
    let err = b.try_build().unwrap_err();
    err.downcast_ref::<BuildError>().cloned().unwrap()
}

#[test]
fn builder_reports_missing_peripherals() {
    assert!(matches!(missing(Robot::builder()), BuildError::MissingDrive));
    let b = Robot::builder()
        .with_drive(SimulatedDrive::new())
        .with_line_sensors(ScriptedLineSensors::clear());
    assert!(matches!(missing(b), BuildError::MissingRangeFinder));
}

#[rstest]
#[case(TelemetryCfg { capacity: 0, ..TelemetryCfg::default() })]
#[case(TelemetryCfg { start_address: 1010, ..TelemetryCfg::default() })]
#[case(TelemetryCfg { lsb_per_g: 0.0, ..TelemetryCfg::default() })]
#[case(TelemetryCfg { capacity: 10, start_address: 30, ..TelemetryCfg::default() })]
#[case(TelemetryCfg { capacity: 10, start_address: 1000, reserved_floor: 800, ..TelemetryCfg::default() })]
fn builder_rejects_bad_telemetry(#[case] cfg: TelemetryCfg) {
    let b = Robot::builder()
        .with_drive(SimulatedDrive::new())
        .with_line_sensors(ScriptedLineSensors::clear())
        .with_range_finder(ScriptedRangeFinder::constant_cm(100.0))
        .with_imu(ScriptedImu::new([[0, 0, 0]]))
        .with_store(MemoryEeprom::new(1024))
        .with_remote(ScriptedRemote::idle())
        .with_indicator(SimulatedIndicator::new())
        .with_telemetry(cfg);
    assert!(matches!(missing(b), BuildError::InvalidConfig(_)));
}

#[test]
fn starts_manual_and_follows_the_stick() {
    let (mut r, h) = robot(vec![None], (0, 7), 100.0);
    assert_eq!(r.step().unwrap(), CycleStatus::Running(OperatingMode::Manual));
    assert_eq!(
        h.drive.snapshot(),
        vec![
            DriveCommand::Left { speed: 255, direction: Direction::Forward },
            DriveCommand::Right { speed: 255, direction: Direction::Forward },
        ]
    );
    assert_eq!(h.clock.elapsed(), Duration::from_millis(10));
}

#[test]
fn toggle_press_switches_to_autonomous_once() {
    let (mut r, _h) = robot(vec![None, TOGGLE, TOGGLE, TOGGLE, None], (0, 0), 100.0);
    let modes: Vec<CycleStatus> = (0..5).map(|_| r.step().unwrap()).collect();
    assert_eq!(modes[0], CycleStatus::Running(OperatingMode::Manual));
    for m in &modes[1..] {
        assert_eq!(*m, CycleStatus::Running(OperatingMode::Autonomous));
    }
    assert_eq!(r.nav_state(), NavState::Forward);
    assert!(r.ramp() > 0);
}

#[test]
fn kill_halts_and_stays_halted() {
    let (mut r, h) = robot(vec![None, KILL, None], (0, 7), 100.0);
    assert!(matches!(r.step().unwrap(), CycleStatus::Running(_)));
    assert_eq!(r.step().unwrap(), CycleStatus::Halted);
    assert!(r.is_halted());
    assert_eq!(r.step().unwrap(), CycleStatus::Halted);
    assert_eq!(h.sent.snapshot(), vec![KILL_MESSAGE.to_string()]);
    assert_eq!(h.drive.last(), Some(DriveCommand::StopAll));
}

#[test]
fn obstacle_in_autonomous_runs_a_bypass() {
    // obstacle 5 cm away on every pulse; line never comes back
    let (mut r, h) = robot(vec![None, TOGGLE, None], (0, 0), 5.0);
    r.step().unwrap();
    assert_eq!(r.step().unwrap(), CycleStatus::Running(OperatingMode::Autonomous));
    assert_eq!(r.nav_state(), NavState::Lost);
    assert_eq!(h.sent.snapshot(), vec!["line not found".to_string()]);
}

#[test]
fn runner_stops_at_cycle_limit() {
    let (mut r, h) = robot(vec![None], (0, 0), 100.0);
    let stop = AtomicBool::new(false);
    let out = run(&mut r, RunLimits::cycles(5), &stop).unwrap();
    assert_eq!(out, RunOutcome::CycleLimit { cycles: 5 });
    assert_eq!(h.drive.last(), Some(DriveCommand::StopAll));
}

#[test]
fn runner_honours_shutdown_flag() {
    let (mut r, _h) = robot(vec![None], (0, 0), 100.0);
    let stop = AtomicBool::new(true);
    let out = run(&mut r, RunLimits::default(), &stop).unwrap();
    assert_eq!(out, RunOutcome::Shutdown { cycles: 0 });
}

#[test]
fn runner_returns_on_kill() {
    let (mut r, _h) = robot(vec![None, None, KILL], (0, 0), 100.0);
    let stop = AtomicBool::new(false);
    let out = run(&mut r, RunLimits::default(), &stop).unwrap();
    assert_eq!(out, RunOutcome::Halted { cycles: 3 });
}

#[test]
fn runner_until_condition_finishes() {
    let (mut r, h) = robot(vec![None], (0, 0), 100.0);
    let clock = h.clock.clone();
    let limits = RunLimits {
        max_cycles: None,
        until: Some(Box::new(move || clock.elapsed() >= Duration::from_millis(50))),
    };
    let out = run(&mut r, limits, &AtomicBool::new(false)).unwrap();
    assert_eq!(out, RunOutcome::Finished { cycles: 5 });
}

const SAVE: Option<u8> = Some(3);

fn telemetry_robot(cfg: TelemetryCfg, store: MemoryEeprom, buttons: Vec<Option<u8>>) -> (Robot, TextLog) {
    let remote = ScriptedRemote::new(buttons);
    let sent = remote.sent();
    let robot = Robot::builder()
        .with_drive(SimulatedDrive::new())
        .with_line_sensors(ScriptedLineSensors::clear())
        .with_range_finder(ScriptedRangeFinder::constant_cm(100.0))
        .with_imu(ScriptedImu::new([[0, 0, 16384]]))
        .with_store(store)
        .with_remote(remote)
        .with_indicator(SimulatedIndicator::new())
        .with_clock(Arc::new(VirtualClock::new()))
        .with_telemetry(cfg)
        .try_build()
        .unwrap();
    (robot, sent)
}

#[test]
fn every_slot_of_the_lowest_valid_layout_is_usable() {
    // 10 slots, the last one at address 0
    let cfg = TelemetryCfg {
        capacity: 10,
        start_address: 216,
        ..TelemetryCfg::default()
    };
    let buttons: Vec<Option<u8>> = (0..10).flat_map(|_| [SAVE, None]).collect();
    let (mut r, sent) = telemetry_robot(cfg, MemoryEeprom::new(1024), buttons);
    for _ in 0..20 {
        r.step().unwrap();
    }
    assert_eq!(r.saved_count(), 10);
    assert!(sent.snapshot().iter().any(|t| t.starts_with("saved #10:")));
    assert!(!sent.snapshot().iter().any(|t| t.starts_with("storage full")));
}

#[test]
fn save_cursor_resumes_after_stored_records() {
    let mut store = MemoryEeprom::new(1024);
    store.write_record(1000, [1.0, 2.0, 3.0]).unwrap();
    store.write_record(976, [0.5, 0.5, 0.5]).unwrap();

    let (mut r, sent) = telemetry_robot(TelemetryCfg::default(), store, vec![SAVE, None, Some(4), None]);
    assert_eq!(r.saved_count(), 2);
    for _ in 0..4 {
        r.step().unwrap();
    }
    assert_eq!(r.saved_count(), 3);
    let texts = sent.snapshot();
    assert!(texts.iter().any(|t| t.starts_with("saved #3:")));
    assert!(texts.contains(&"#1: x=1.000 y=2.000 z=3.000".to_string()));
    assert_eq!(r.records().unwrap().len(), 3);
}

/// Constant reading; flags when the sampler thread releases it.
struct FlatImu {
    raw: [i16; 3],
    released: Arc<AtomicBool>,
}

impl Imu for FlatImu {
    fn read_raw(&mut self) -> HwResult<[i16; 3]> {
        Ok(self.raw)
    }
}

impl Drop for FlatImu {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

#[test]
fn background_sampling_feeds_peaks_and_joins_on_drop() {
    let released = Arc::new(AtomicBool::new(false));
    let imu = FlatImu {
        raw: [8192, 0, -16384],
        released: released.clone(),
    };
    let mut r = Robot::builder()
        .with_drive(SimulatedDrive::new())
        .with_line_sensors(ScriptedLineSensors::clear())
        .with_range_finder(ScriptedRangeFinder::constant_cm(100.0))
        .with_imu(imu)
        .with_store(MemoryEeprom::new(1024))
        .with_remote(ScriptedRemote::idle())
        .with_indicator(SimulatedIndicator::new())
        .with_clock(Arc::new(VirtualClock::new()))
        .with_telemetry(TelemetryCfg {
            sample_interval_ms: 1,
            background: true,
            ..TelemetryCfg::default()
        })
        .try_build()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while r.peak().z == 0.0 {
        assert!(Instant::now() < deadline, "no background sample within 2s");
        r.step().unwrap();
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(r.peak().x, 0.5);
    assert_eq!(r.peak().z, 1.0);
    assert!(!released.load(Ordering::SeqCst));

    drop(r);
    assert!(released.load(Ordering::SeqCst));
}
