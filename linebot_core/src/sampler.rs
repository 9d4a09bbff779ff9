//! Background IMU sampling.
//!
//! Spawns a thread that owns the `Imu` and keeps the latest raw sample in a
//! bounded channel (newest wins). The telemetry recorder stays the only
//! writer of the running maxima; it just pulls from here.
//!
//! Each `ImuSampler` owns exactly one thread, shut down and joined on drop.
use crossbeam_channel as xch;
use linebot_traits::clock::Clock;
use linebot_traits::{HwResult, Imu};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct ImuSampler {
    rx: xch::Receiver<[i16; 3]>,
    last_ok: Arc<AtomicU64>,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl ImuSampler {
    pub fn spawn<I: Imu + Send + 'static, C: Clock + Send + Sync + 'static>(
        mut imu: I,
        period: Duration,
        clock: C,
    ) -> Self {
        let (tx, rx) = xch::bounded(1);
        let drain = rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let epoch = clock.now();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("imu sampler received shutdown signal");
                    break;
                }

                match imu.read_raw() {
                    Ok(v) => {
                        // Replace an unread sample rather than block on a slow consumer.
                        if let Err(xch::TrySendError::Full(v)) = tx.try_send(v) {
                            let _ = drain.try_recv();
                            let _ = tx.try_send(v);
                        }
                        last_ok_clone.store(clock.ms_since(epoch), Ordering::Relaxed);
                    }
                    Err(e) => tracing::debug!(error = %e, "imu read failed"),
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("imu sampler exiting cleanly");
        });

        Self {
            rx,
            last_ok,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    pub fn latest(&self) -> Option<[i16; 3]> {
        self.rx.try_iter().last()
    }

    /// Milliseconds since the last successful read, measured on a real clock.
    pub fn stalled_for_now(&self) -> u64 {
        let ms = Instant::now().saturating_duration_since(self.epoch).as_millis();
        let now_ms = ms.min(u128::from(u64::MAX)) as u64;
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }
}

impl Drop for ImuSampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("imu sampler joined"),
                Err(e) => tracing::warn!(?e, "imu sampler panicked during shutdown"),
            }
        }
    }
}

/// `Imu` view over an [`ImuSampler`]: returns the newest sample, or the
/// previous one when nothing new arrived since the last read. Reads as rest
/// (all zero) until the first sample lands; zero never raises a maximum.
pub struct SampledImu {
    sampler: ImuSampler,
    last: [i16; 3],
    stall_after: Duration,
    stalled: bool,
}

impl SampledImu {
    pub fn new(sampler: ImuSampler, stall_after: Duration) -> Self {
        Self {
            sampler,
            last: [0; 3],
            stall_after,
            stalled: false,
        }
    }

    /// True while the worker has gone `stall_after` without a good read.
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }
}

impl Imu for SampledImu {
    fn read_raw(&mut self) -> HwResult<[i16; 3]> {
        if let Some(v) = self.sampler.latest() {
            if self.stalled {
                tracing::info!("imu sampler recovered");
            }
            self.last = v;
            self.stalled = false;
            return Ok(v);
        }
        let quiet_ms = self.sampler.stalled_for_now();
        let limit_ms = u64::try_from(self.stall_after.as_millis()).unwrap_or(u64::MAX);
        if !self.stalled && quiet_ms >= limit_ms {
            tracing::warn!(quiet_ms, "imu sampler stalled, reusing last sample");
            self.stalled = true;
        }
        Ok(self.last)
    }
}
