//! Accelerometer peak tracking with persistence.
//!
//! The recorder keeps per-axis running maxima of |g|. A save press writes
//! them to the next free slot and resets them to zero; a report press reads
//! every saved slot back. Slot `i` lives at `start_address - i * 24`, so the
//! record area grows downwards from `start_address`.

use std::time::Duration;

use linebot_config::RECORD_STRIDE;
use linebot_traits::{Clock, Imu, Indicator, RecordStore, Remote};
use tracing::{debug, info, warn};

use crate::config::TelemetryCfg;
use crate::error::Result;
use crate::hw_error::HwContext;
use crate::schedule::Every;
use crate::types::{Button, OperatingMode, PeakG};

/// Peripherals a telemetry tick may touch.
pub struct TelemetryIo<'a> {
    pub imu: &'a mut dyn Imu,
    pub store: &'a mut dyn RecordStore,
    pub remote: &'a mut dyn Remote,
    pub indicator: &'a mut dyn Indicator,
    pub clock: &'a dyn Clock,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SaveOutcome {
    /// Written as record `number` (1-based).
    Saved { number: u16, address: u16, peak: PeakG },
    /// Every slot is taken; nothing was written and the maxima are kept.
    CapacityExceeded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Empty,
    Records(Vec<PeakG>),
}

#[derive(Debug, Clone)]
pub struct TelemetryRecorder {
    cfg: TelemetryCfg,
    cadence: Every,
    peak: PeakG,
    saved: u16,
    previous: Button,
}

/// Erased storage reads back as all-ones bytes.
fn is_erased(record: &[f64; 3]) -> bool {
    record.iter().all(|v| v.to_bits() == u64::MAX)
}

impl TelemetryRecorder {
    pub fn new(cfg: TelemetryCfg) -> Self {
        let cadence = Every::from_millis(cfg.sample_interval_ms);
        Self {
            cfg,
            cadence,
            peak: PeakG::default(),
            saved: 0,
            previous: Button::None,
        }
    }

    /// Recorder whose save cursor continues after the records already in
    /// `store`, so a restart never overwrites them.
    pub fn resume(cfg: TelemetryCfg, store: &mut dyn RecordStore) -> Result<Self> {
        let existing = Self::scan(&cfg, store, cfg.capacity)?.len();
        let mut r = Self::new(cfg);
        r.saved = u16::try_from(existing).unwrap_or(r.cfg.capacity);
        if r.saved > 0 {
            info!(records = r.saved, "telemetry resuming after stored records");
        }
        Ok(r)
    }

    pub fn peak(&self) -> PeakG {
        self.peak
    }

    /// Records saved since boot.
    pub fn saved_count(&self) -> u16 {
        self.saved
    }

    pub fn capacity(&self) -> u16 {
        self.cfg.capacity
    }

    /// Address of 0-based slot `index`, `None` past capacity.
    pub fn slot_address(&self, index: u16) -> Option<u16> {
        slot_address(&self.cfg, index)
    }

    /// Fold one raw sample into the maxima.
    pub fn absorb_raw(&mut self, raw: [i16; 3]) {
        let lsb = f64::from(self.cfg.lsb_per_g);
        self.peak.absorb(raw.map(|v| f64::from(v) / lsb));
    }

    /// Read the IMU when the sampling cadence is due. Returns whether a
    /// sample was taken.
    pub fn sample(&mut self, imu: &mut dyn Imu, clock: &dyn Clock) -> Result<bool> {
        if !self.cadence.due(clock.now()) {
            return Ok(false);
        }
        let raw = imu.read_raw().hw("reading accelerometer")?;
        self.absorb_raw(raw);
        Ok(true)
    }

    /// Persist the current maxima into the next free slot.
    pub fn save(&mut self, io: &mut TelemetryIo<'_>, mode: OperatingMode) -> Result<SaveOutcome> {
        let Some(address) = self.slot_address(self.saved) else {
            warn!(capacity = self.cfg.capacity, "telemetry storage full");
            io.remote
                .send_text(&format!("storage full ({} records)", self.cfg.capacity))
                .hw("sending remote text")?;
            return Ok(SaveOutcome::CapacityExceeded);
        };

        let peak = self.peak;
        io.store
            .write_record(address, peak.to_array())
            .hw("writing telemetry record")?;
        self.saved += 1;
        self.peak = PeakG::default();
        info!(number = self.saved, address, %peak, "telemetry saved");

        let steady = mode.indicator_level();
        io.indicator.set(!steady).hw("blinking indicator")?;
        io.clock.sleep(Duration::from_millis(self.cfg.blink_ms));
        io.indicator.set(steady).hw("restoring indicator")?;

        io.remote
            .send_text(&format!("saved #{}: {peak}", self.saved))
            .hw("sending remote text")?;
        Ok(SaveOutcome::Saved {
            number: self.saved,
            address,
            peak,
        })
    }

    /// Send every saved record to the remote, oldest first.
    pub fn report(&mut self, store: &mut dyn RecordStore, remote: &mut dyn Remote) -> Result<ReportOutcome> {
        if self.saved == 0 {
            remote
                .send_text("nothing saved yet")
                .hw("sending remote text")?;
            return Ok(ReportOutcome::Empty);
        }
        let records = self.records(store)?;
        for (i, r) in records.iter().enumerate() {
            remote
                .send_text(&format!("#{}: {r}", i + 1))
                .hw("sending remote text")?;
        }
        debug!(count = records.len(), "telemetry reported");
        Ok(ReportOutcome::Records(records))
    }

    /// Records saved since boot, oldest first.
    pub fn records(&self, store: &mut dyn RecordStore) -> Result<Vec<PeakG>> {
        (0..self.saved)
            .filter_map(|i| self.slot_address(i))
            .map(|a| {
                let r = store.read_record(a).hw("reading telemetry record")?;
                Ok(PeakG::from_array(r))
            })
            .collect()
    }

    /// Records present in `store` regardless of this boot's count: reads
    /// from the oldest slot and stops at the first erased one.
    pub fn scan(cfg: &TelemetryCfg, store: &mut dyn RecordStore, limit: u16) -> Result<Vec<PeakG>> {
        let mut out = Vec::new();
        for i in 0..limit.min(cfg.capacity) {
            let Some(address) = slot_address(cfg, i) else {
                break;
            };
            let r = store.read_record(address).hw("reading telemetry record")?;
            if is_erased(&r) {
                break;
            }
            out.push(PeakG::from_array(r));
        }
        Ok(out)
    }

    /// One control-cycle tick: sample, then act on save/report edges.
    pub fn tick(&mut self, button: Button, mode: OperatingMode, io: &mut TelemetryIo<'_>) -> Result<()> {
        self.sample(&mut *io.imu, io.clock)?;

        let pressed = |b: Button| button == b && self.previous != b;
        let save = pressed(Button::SaveTelemetry);
        let report = pressed(Button::ReportTelemetry);
        self.previous = button;

        if save {
            self.save(io, mode)?;
        }
        if report {
            self.report(&mut *io.store, &mut *io.remote)?;
        }
        Ok(())
    }
}

fn slot_address(cfg: &TelemetryCfg, index: u16) -> Option<u16> {
    if index >= cfg.capacity {
        return None;
    }
    cfg.start_address.checked_sub(index.checked_mul(RECORD_STRIDE)?)
}
