//! Two-sensor line following with eased speed ramps.
//!
//! | left | right | state     | left wheel             | right wheel            |
//! |------|-------|-----------|------------------------|------------------------|
//! | off  | off   | Forward   | fast→floor, forward    | fast→floor, forward    |
//! | on   | off   | TurnLeft  | inner start→floor, rev | outer, forward         |
//! | off  | on    | TurnRight | outer, forward         | inner start→floor, rev |
//! | on   | on    | Lost      | spin start→floor, fwd  | spin start→floor, rev  |
//!
//! Both sensors clear means the line runs between them. Both on the line is
//! a crossing or a lost track and triggers a spin search.
//!
//! The ramp counts cycles spent in the same state and resets on every change.

use linebot_traits::Direction;

use super::{NavIo, Navigator};
use crate::config::LineFollowCfg;
use crate::error::Result;
use crate::hw_error::HwContext;
use crate::types::{LineReading, NavState};

pub const RAMP_CAP: u8 = 60;
pub const LOST_RAMP_CAP: u8 = 30;

/// Speed/direction pair for each wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelCommand {
    pub left: (u8, Direction),
    pub right: (u8, Direction),
}

pub fn state_for(line: LineReading) -> NavState {
    match (line.left_on(), line.right_on()) {
        (false, false) => NavState::Forward,
        (true, false) => NavState::TurnLeft,
        (false, true) => NavState::TurnRight,
        (true, true) => NavState::Lost,
    }
}

pub fn ramp_cap(state: NavState) -> u8 {
    if state == NavState::Lost {
        LOST_RAMP_CAP
    } else {
        RAMP_CAP
    }
}

/// `start - (start - floor) * ramp / cap`, with `ramp` clamped to `cap`.
pub fn eased(start: u8, floor: u8, ramp: u8, cap: u8) -> u8 {
    let cap = u32::from(cap.max(1));
    let span = u32::from(start.saturating_sub(floor));
    let drop = span * u32::from(ramp).min(cap) / cap;
    start - drop as u8
}

/// Wheel command for a line-follow state. Bypass states have no table entry.
pub fn command_for(state: NavState, ramp: u8, cfg: &LineFollowCfg) -> Option<WheelCommand> {
    use Direction::{Forward, Reverse};
    let cap = ramp_cap(state);
    let cmd = match state {
        NavState::Forward => {
            let v = eased(cfg.fast_speed, cfg.floor_speed, ramp, cap);
            WheelCommand {
                left: (v, Forward),
                right: (v, Forward),
            }
        }
        NavState::TurnLeft => WheelCommand {
            left: (
                eased(cfg.turn_inner_start, cfg.turn_inner_floor, ramp, cap),
                Reverse,
            ),
            right: (cfg.turn_outer_speed, Forward),
        },
        NavState::TurnRight => WheelCommand {
            left: (cfg.turn_outer_speed, Forward),
            right: (
                eased(cfg.turn_inner_start, cfg.turn_inner_floor, ramp, cap),
                Reverse,
            ),
        },
        NavState::Lost => {
            let v = eased(cfg.spin_start, cfg.spin_floor, ramp, cap);
            WheelCommand {
                left: (v, Forward),
                right: (v, Reverse),
            }
        }
        NavState::BypassScan | NavState::BypassLeft | NavState::BypassRight => return None,
    };
    Some(cmd)
}

impl Navigator {
    /// Classify `line`, advance or reset the ramp, and drive the wheels.
    pub(crate) fn follow_line(&mut self, line: LineReading, io: &mut NavIo<'_>) -> Result<()> {
        let next = state_for(line);
        if next == self.state {
            if self.ramp < ramp_cap(next) {
                self.ramp += 1;
                io.clock
                    .sleep(std::time::Duration::from_millis(self.line_cfg.ramp_delay_ms));
            }
        } else {
            self.set_state(next);
        }

        if let Some(cmd) = command_for(self.state, self.ramp, &self.line_cfg) {
            tracing::trace!(state = ?self.state, ramp = self.ramp, ?cmd, "line follow");
            io.drive
                .drive_left(cmd.left.0, cmd.left.1)
                .hw("driving left wheel")?;
            io.drive
                .drive_right(cmd.right.0, cmd.right.1)
                .hw("driving right wheel")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(200, 120, 0, 60, 200)]
    #[case(200, 120, 30, 60, 160)]
    #[case(200, 120, 60, 60, 120)]
    #[case(200, 120, 90, 60, 120)]
    #[case(180, 100, 30, 30, 100)]
    #[case(150, 60, 1, 60, 149)]
    fn easing_formula(
        #[case] start: u8,
        #[case] floor: u8,
        #[case] ramp: u8,
        #[case] cap: u8,
        #[case] expected: u8,
    ) {
        assert_eq!(eased(start, floor, ramp, cap), expected);
    }

    #[test]
    fn table_matches_sensor_pairs() {
        assert_eq!(state_for(LineReading::new(false, false)), NavState::Forward);
        assert_eq!(state_for(LineReading::new(true, false)), NavState::TurnLeft);
        assert_eq!(state_for(LineReading::new(false, true)), NavState::TurnRight);
        assert_eq!(state_for(LineReading::new(true, true)), NavState::Lost);
    }

    #[test]
    fn turn_left_drives_outer_wheel_full() {
        let cmd = command_for(NavState::TurnLeft, 0, &LineFollowCfg::default()).unwrap();
        assert_eq!(cmd.right, (255, Direction::Forward));
        assert_eq!(cmd.left, (150, Direction::Reverse));
        assert!(command_for(NavState::BypassScan, 0, &LineFollowCfg::default()).is_none());
    }
}
