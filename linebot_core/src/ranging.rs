//! Rate-limited ultrasonic distance sampling.

use std::time::Duration;

use linebot_traits::{Clock, RangeFinder};
use tracing::{debug, trace};

use crate::config::RangingCfg;
use crate::error::Result;
use crate::hw_error::HwContext;
use crate::schedule::Every;
use crate::types::{Distance, RangeSample};

#[derive(Debug, Clone)]
pub struct RangingSampler {
    cfg: RangingCfg,
    cadence: Every,
}

impl RangingSampler {
    pub fn new(cfg: RangingCfg) -> Self {
        let cadence = Every::from_millis(cfg.interval_ms);
        Self { cfg, cadence }
    }

    /// Obstacle threshold, also the sentinel for missing samples.
    pub fn threshold(&self) -> Distance {
        self.cfg.obstacle_threshold_cm
    }

    /// One pulse if the sampling interval has elapsed, `NoSample` otherwise.
    /// The interval restarts whenever a pulse is attempted, even a failed one.
    pub fn sample(&mut self, finder: &mut dyn RangeFinder, clock: &dyn Clock) -> Result<RangeSample> {
        if !self.cadence.due(clock.now()) {
            return Ok(RangeSample::NoSample);
        }
        self.pulse(finder)
    }

    /// One pulse now, regardless of the interval.
    pub fn measure(&mut self, finder: &mut dyn RangeFinder, clock: &dyn Clock) -> Result<RangeSample> {
        self.cadence.mark(clock.now());
        self.pulse(finder)
    }

    pub fn echo_to_cm(&self, echo_us: u32) -> Distance {
        echo_us as f32 * self.cfg.speed_of_sound_cm_per_us / 2.0
    }

    fn pulse(&mut self, finder: &mut dyn RangeFinder) -> Result<RangeSample> {
        let timeout = Duration::from_millis(self.cfg.echo_timeout_ms);
        let echo_us = finder.echo_us(timeout).hw("ranging pulse")?;
        if echo_us == 0 {
            debug!("no echo");
            return Ok(RangeSample::NoSample);
        }
        let cm = self.echo_to_cm(echo_us);
        trace!(echo_us, cm, "range");
        Ok(RangeSample::Fresh(cm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linebot_hardware::ScriptedRangeFinder;
    use linebot_traits::VirtualClock;

    #[test]
    fn rate_limits_between_pulses() {
        let clock = VirtualClock::new();
        let mut finder = ScriptedRangeFinder::new([1166]);
        let mut r = RangingSampler::new(RangingCfg::default());

        match r.sample(&mut finder, &clock).unwrap() {
            RangeSample::Fresh(cm) => assert!((cm - 20.0).abs() < 0.05),
            other => panic!("expected a sample, got {other:?}"),
        }
        clock.advance(Duration::from_millis(30));
        assert_eq!(r.sample(&mut finder, &clock).unwrap(), RangeSample::NoSample);
        clock.advance(Duration::from_millis(30));
        assert!(matches!(r.sample(&mut finder, &clock).unwrap(), RangeSample::Fresh(_)));
    }

    #[test]
    fn zero_echo_is_no_sample() {
        let clock = VirtualClock::new();
        let mut finder = ScriptedRangeFinder::new([0]);
        let mut r = RangingSampler::new(RangingCfg::default());
        assert_eq!(r.measure(&mut finder, &clock).unwrap(), RangeSample::NoSample);
    }

    #[test]
    fn measure_ignores_interval_but_defers_sampling() {
        let clock = VirtualClock::new();
        let mut finder = ScriptedRangeFinder::constant_cm(40.0);
        let mut r = RangingSampler::new(RangingCfg::default());
        assert!(matches!(r.measure(&mut finder, &clock).unwrap(), RangeSample::Fresh(_)));
        assert!(matches!(r.measure(&mut finder, &clock).unwrap(), RangeSample::Fresh(_)));
        assert_eq!(r.sample(&mut finder, &clock).unwrap(), RangeSample::NoSample);
    }
}
