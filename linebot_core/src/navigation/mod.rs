//! Autonomous navigation: line following plus obstacle bypass.
//!
//! Every autonomous cycle takes one line reading and one distance. A
//! distance below the obstacle threshold hands the cycle to the bypass
//! maneuver; anything else goes through the line-follow table.

pub mod bypass;
pub mod line_follow;

use linebot_traits::{Clock, Drive, LineSensors, RangeFinder, Remote};
use tracing::{debug, info};

use crate::config::{BypassCfg, LineFollowCfg};
use crate::error::Result;
use crate::kill_switch::KillSwitch;
use crate::ranging::RangingSampler;
use crate::status::Maneuver;
use crate::types::{Distance, LineReading, NavState};

/// Peripherals a navigation step may touch.
pub struct NavIo<'a> {
    pub drive: &'a mut dyn Drive,
    pub line: &'a mut dyn LineSensors,
    pub ranger: &'a mut dyn RangeFinder,
    pub remote: &'a mut dyn Remote,
    pub clock: &'a dyn Clock,
    pub ranging: &'a mut RangingSampler,
    pub kill: &'a mut KillSwitch,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    state: NavState,
    ramp: u8,
    line_cfg: LineFollowCfg,
    bypass_cfg: BypassCfg,
    threshold: Distance,
}

impl Navigator {
    pub fn new(line_cfg: LineFollowCfg, bypass_cfg: BypassCfg, threshold: Distance) -> Self {
        Self {
            state: NavState::Forward,
            ramp: 0,
            line_cfg,
            bypass_cfg,
            threshold,
        }
    }

    #[inline]
    pub fn state(&self) -> NavState {
        self.state
    }

    #[inline]
    pub fn ramp(&self) -> u8 {
        self.ramp
    }

    pub fn line_cfg(&self) -> &LineFollowCfg {
        &self.line_cfg
    }

    pub fn bypass_cfg(&self) -> &BypassCfg {
        &self.bypass_cfg
    }

    /// Enter `next`, resetting the ramp on an actual change.
    pub(crate) fn set_state(&mut self, next: NavState) {
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "nav state");
            self.state = next;
            self.ramp = 0;
        }
    }

    /// One autonomous cycle.
    pub fn autonomous_step(
        &mut self,
        line: LineReading,
        distance: Distance,
        io: &mut NavIo<'_>,
    ) -> Result<Maneuver> {
        if distance < self.threshold {
            info!(distance, threshold = self.threshold, "obstacle ahead");
            return bypass::run(self, io);
        }
        self.follow_line(line, io)?;
        Ok(Maneuver::Continue)
    }
}
