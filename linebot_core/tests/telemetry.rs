use std::time::Duration;

use linebot_core::config::TelemetryCfg;
use linebot_core::telemetry::{ReportOutcome, SaveOutcome, TelemetryIo, TelemetryRecorder};
use linebot_core::{Button, OperatingMode, PeakG};
use linebot_hardware::{MemoryEeprom, ScriptedImu, ScriptedRemote, SimulatedIndicator};
use linebot_traits::{RecordStore, VirtualClock};
use rstest::rstest;

struct Bench {
    imu: ScriptedImu,
    store: MemoryEeprom,
    remote: ScriptedRemote,
    led: SimulatedIndicator,
    clock: VirtualClock,
}

impl Bench {
    fn new(samples: Vec<[i16; 3]>) -> Self {
        Self {
            imu: ScriptedImu::new(samples),
            store: MemoryEeprom::new(1024),
            remote: ScriptedRemote::idle(),
            led: SimulatedIndicator::new(),
            clock: VirtualClock::new(),
        }
    }

    fn io(&mut self) -> TelemetryIo<'_> {
        TelemetryIo {
            imu: &mut self.imu,
            store: &mut self.store,
            remote: &mut self.remote,
            indicator: &mut self.led,
            clock: &self.clock,
        }
    }
}

fn small(capacity: u16) -> TelemetryCfg {
    TelemetryCfg {
        capacity,
        ..TelemetryCfg::default()
    }
}

#[test]
fn save_writes_slot_and_resets_peaks() {
    let mut b = Bench::new(vec![[8192, -4096, 16384]]);
    let sent = b.remote.sent();
    let levels = b.led.levels();
    let mut r = TelemetryRecorder::new(TelemetryCfg::default());

    r.tick(Button::None, OperatingMode::Manual, &mut b.io()).unwrap();
    r.tick(Button::SaveTelemetry, OperatingMode::Manual, &mut b.io()).unwrap();

    assert_eq!(r.saved_count(), 1);
    assert_eq!(r.peak(), PeakG::default());
    assert_eq!(b.store.read_record(1000).unwrap(), [0.5, 0.25, 1.0]);
    assert_eq!(sent.snapshot(), vec!["saved #1: x=0.500 y=0.250 z=1.000".to_string()]);
    // blink inverts the manual (off) level, then restores it
    assert_eq!(levels.snapshot(), vec![true, false]);
}

#[test]
fn held_save_button_saves_once() {
    let mut b = Bench::new(vec![[100, 100, 100]]);
    let mut r = TelemetryRecorder::new(TelemetryCfg::default());
    for _ in 0..5 {
        r.tick(Button::SaveTelemetry, OperatingMode::Autonomous, &mut b.io())
            .unwrap();
    }
    assert_eq!(r.saved_count(), 1);
}

#[test]
fn samples_follow_the_interval() {
    let mut b = Bench::new(vec![[0, 0, 0], [16384, 0, 0], [0, 0, -32768]]);
    let mut r = TelemetryRecorder::new(TelemetryCfg::default());
    assert!(r.sample(&mut b.imu, &b.clock).unwrap());
    assert!(!r.sample(&mut b.imu, &b.clock).unwrap());
    b.clock.advance(Duration::from_millis(100));
    assert!(r.sample(&mut b.imu, &b.clock).unwrap());
    assert_eq!(r.peak().x, 1.0);
    b.clock.advance(Duration::from_millis(100));
    r.sample(&mut b.imu, &b.clock).unwrap();
    assert_eq!(r.peak().to_array(), [1.0, 0.0, 2.0]);
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(10)]
fn save_past_capacity_is_rejected(#[case] capacity: u16) {
    let mut b = Bench::new(vec![[1000, 2000, 3000]]);
    let sent = b.remote.sent();
    let mut r = TelemetryRecorder::new(small(capacity));
    for n in 1..=capacity {
        r.absorb_raw([1000, 2000, 3000]);
        let out = r.save(&mut b.io(), OperatingMode::Manual).unwrap();
        assert!(matches!(out, SaveOutcome::Saved { number, .. } if number == n));
    }
    let image = b.store.image().to_vec();

    r.absorb_raw([4000, 0, 0]);
    let out = r.save(&mut b.io(), OperatingMode::Manual).unwrap();
    assert_eq!(out, SaveOutcome::CapacityExceeded);
    assert_eq!(r.saved_count(), capacity);
    assert_eq!(b.store.image(), &image[..]);
    // maxima survive a rejected save
    assert!(r.peak().x > 0.0);
    assert_eq!(
        sent.last(),
        Some(format!("storage full ({capacity} records)"))
    );
}

#[test]
fn report_lists_records_oldest_first() {
    let mut b = Bench::new(vec![[0, 0, 0]]);
    let sent = b.remote.sent();
    let mut r = TelemetryRecorder::new(TelemetryCfg::default());

    let out = r.report(&mut b.store, &mut b.remote).unwrap();
    assert_eq!(out, ReportOutcome::Empty);
    assert_eq!(sent.snapshot(), vec!["nothing saved yet".to_string()]);

    r.absorb_raw([16384, 0, 0]);
    r.save(&mut b.io(), OperatingMode::Manual).unwrap();
    r.absorb_raw([0, 8192, 0]);
    r.save(&mut b.io(), OperatingMode::Manual).unwrap();

    let before = sent.len();
    let out = r.report(&mut b.store, &mut b.remote).unwrap();
    let lines = sent.snapshot()[before..].to_vec();
    assert_eq!(
        lines,
        vec![
            "#1: x=1.000 y=0.000 z=0.000".to_string(),
            "#2: x=0.000 y=0.500 z=0.000".to_string(),
        ]
    );
    match out {
        ReportOutcome::Records(v) => assert_eq!(v.len(), 2),
        other => panic!("expected records, got {other:?}"),
    }
    assert_eq!(b.store.read_record(976).unwrap(), [0.0, 0.5, 0.0]);
}

#[test]
fn scan_stops_at_first_erased_slot() {
    let mut store = MemoryEeprom::new(1024);
    store.write_record(1000, [1.0, 2.0, 3.0]).unwrap();
    store.write_record(976, [4.0, 5.0, 6.0]).unwrap();
    // slot 3 written but slot 2 erased
    store.write_record(928, [7.0, 8.0, 9.0]).unwrap();
    let got = TelemetryRecorder::scan(&TelemetryCfg::default(), &mut store, 10).unwrap();
    assert_eq!(
        got,
        vec![
            PeakG::from_array([1.0, 2.0, 3.0]),
            PeakG::from_array([4.0, 5.0, 6.0]),
        ]
    );
    let one = TelemetryRecorder::scan(&TelemetryCfg::default(), &mut store, 1).unwrap();
    assert_eq!(one.len(), 1);
}

#[test]
fn report_press_in_tick_sends_lines() {
    let mut b = Bench::new(vec![[16384, 16384, 16384]]);
    let sent = b.remote.sent();
    let mut r = TelemetryRecorder::new(TelemetryCfg::default());
    r.tick(Button::SaveTelemetry, OperatingMode::Manual, &mut b.io()).unwrap();
    r.tick(Button::ReportTelemetry, OperatingMode::Manual, &mut b.io()).unwrap();
    assert_eq!(
        sent.snapshot(),
        vec![
            "saved #1: x=1.000 y=1.000 z=1.000".to_string(),
            "#1: x=1.000 y=1.000 z=1.000".to_string(),
        ]
    );
}
