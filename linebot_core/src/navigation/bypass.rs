//! Obstacle bypass as an explicit step machine.
//!
//! `run` polls the kill switch before every step; a tripped switch ends
//! the maneuver with [`Maneuver::Halted`] before the next step's motion
//! starts. Each step's own timed action runs to completion.

use std::time::Duration;

use linebot_traits::Direction;
use tracing::{debug, info, warn};

use super::{NavIo, Navigator};
use crate::config::{BypassCfg, ReacquireTimeout};
use crate::error::Result;
use crate::hw_error::HwContext;
use crate::status::Maneuver;
use crate::types::{LineReading, NavState, Side};

pub const SWEEP_SAMPLES: usize = 6;
/// Sweep index after which the mid-sweep pause is taken.
pub const SWEEP_MID_INDEX: u8 = 3;
pub const LINE_NOT_FOUND: &str = "line not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassStep {
    CheckEdge,
    Settle,
    PivotToScan,
    /// Sweep one notch left and store the reading in `samples[k]`.
    Sweep(u8),
    Decide,
    /// Segment `i` of the script for `side`.
    Script(Side, u8),
    Reacquire(Side),
    Snap(Side),
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Forward,
    TurnLeft,
    TurnRight,
}

impl Motion {
    fn mirrored(self) -> Self {
        match self {
            Motion::Forward => Motion::Forward,
            Motion::TurnLeft => Motion::TurnRight,
            Motion::TurnRight => Motion::TurnLeft,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub motion: Motion,
    pub ms: u64,
}

const fn seg(motion: Motion, ms: u64) -> Segment {
    Segment { motion, ms }
}

/// Open-loop arc around an obstacle on the left. The slow forward leg that
/// closes the arc is `BypassStep::Reacquire`.
pub const LEFT_SCRIPT: [Segment; 5] = [
    seg(Motion::TurnLeft, 400),
    seg(Motion::Forward, 700),
    seg(Motion::TurnRight, 500),
    seg(Motion::Forward, 800),
    seg(Motion::TurnRight, 350),
];

pub fn script_segment(side: Side, i: u8) -> Option<Segment> {
    let s = *LEFT_SCRIPT.get(usize::from(i))?;
    Some(match side {
        Side::Left => s,
        Side::Right => Segment {
            motion: s.motion.mirrored(),
            ..s
        },
    })
}

/// `(avg_left, avg_right)`: indices `0..3` were taken furthest left.
pub fn averages(samples: &[f32; SWEEP_SAMPLES]) -> (f32, f32) {
    let left = samples[..3].iter().sum::<f32>() / 3.0;
    let right = samples[3..].iter().sum::<f32>() / 3.0;
    (left, right)
}

/// Side with more room; ties go right.
pub fn choose_side(samples: &[f32; SWEEP_SAMPLES]) -> Side {
    let (left, right) = averages(samples);
    if left > right { Side::Left } else { Side::Right }
}

/// State of one bypass maneuver.
#[derive(Debug, Clone)]
pub struct Bypass {
    step: BypassStep,
    samples: [f32; SWEEP_SAMPLES],
    polls: u32,
}

impl Default for Bypass {
    fn default() -> Self {
        Self {
            step: BypassStep::CheckEdge,
            samples: [0.0; SWEEP_SAMPLES],
            polls: 0,
        }
    }
}

/// Run a whole bypass maneuver.
pub fn run(nav: &mut Navigator, io: &mut NavIo<'_>) -> Result<Maneuver> {
    let mut bp = Bypass::default();
    loop {
        if io.kill.check_for_abort(&mut *io.remote, &mut *io.drive)? {
            info!(step = ?bp.step, "bypass aborted by kill switch");
            return Ok(Maneuver::Halted);
        }
        if bp.step == BypassStep::Done {
            return Ok(Maneuver::Continue);
        }
        bp.step = bp.advance(nav, io)?;
    }
}

impl Bypass {
    pub fn step(&self) -> BypassStep {
        self.step
    }

    pub fn samples(&self) -> &[f32; SWEEP_SAMPLES] {
        &self.samples
    }

    /// Perform the current step's action and return the next step.
    pub fn advance(&mut self, nav: &mut Navigator, io: &mut NavIo<'_>) -> Result<BypassStep> {
        let cfg = nav.bypass_cfg().clone();
        let next = match self.step {
            BypassStep::CheckEdge => {
                let line = read_line(io)?;
                let edge = if line.left_on() {
                    Some(Side::Left)
                } else if line.right_on() {
                    Some(Side::Right)
                } else {
                    None
                };
                match edge {
                    Some(side) => {
                        debug!(?side, "obstacle at track edge, pivoting");
                        nav.set_state(match side {
                            Side::Left => NavState::TurnLeft,
                            Side::Right => NavState::TurnRight,
                        });
                        pivot(io, side, cfg.pivot_speed, cfg.edge_pivot_ms)?;
                        stop(io)?;
                        BypassStep::Done
                    }
                    None => BypassStep::Settle,
                }
            }
            BypassStep::Settle => {
                stop(io)?;
                pause(io, cfg.settle_ms);
                BypassStep::PivotToScan
            }
            BypassStep::PivotToScan => {
                nav.set_state(NavState::BypassScan);
                pivot(io, Side::Right, cfg.pivot_speed, cfg.scan_pivot_ms)?;
                stop(io)?;
                pause(io, cfg.settle_ms);
                BypassStep::Sweep(SWEEP_SAMPLES as u8 - 1)
            }
            BypassStep::Sweep(k) => {
                pivot(io, Side::Left, cfg.sweep_speed, cfg.sweep_step_ms)?;
                stop(io)?;
                let threshold = io.ranging.threshold();
                let d = io
                    .ranging
                    .measure(&mut *io.ranger, io.clock)?
                    .or_sentinel(threshold);
                self.samples[usize::from(k)] = d;
                debug!(k, distance = d, "sweep sample");
                if k == SWEEP_MID_INDEX {
                    pause(io, cfg.sweep_mid_pause_ms);
                }
                match k.checked_sub(1) {
                    Some(k) => BypassStep::Sweep(k),
                    None => BypassStep::Decide,
                }
            }
            BypassStep::Decide => {
                let (avg_left, avg_right) = averages(&self.samples);
                let side = choose_side(&self.samples);
                info!(avg_left, avg_right, ?side, "bypass direction");
                nav.set_state(match side {
                    Side::Left => NavState::BypassLeft,
                    Side::Right => NavState::BypassRight,
                });
                BypassStep::Script(side, 0)
            }
            BypassStep::Script(side, i) => match script_segment(side, i) {
                Some(s) => {
                    apply(io, s.motion, &cfg)?;
                    pause(io, s.ms);
                    BypassStep::Script(side, i + 1)
                }
                None => {
                    self.polls = 0;
                    BypassStep::Reacquire(side)
                }
            },
            BypassStep::Reacquire(side) => self.reacquire(side, nav, io, &cfg)?,
            BypassStep::Snap(side) => {
                pivot(io, side.mirrored(), cfg.pivot_speed, cfg.snap_ms)?;
                stop(io)?;
                info!(?side, "line reacquired");
                BypassStep::Done
            }
            BypassStep::Done => BypassStep::Done,
        };
        self.step = next;
        Ok(next)
    }

    /// One poll of the slow closing leg.
    fn reacquire(
        &mut self,
        side: Side,
        nav: &mut Navigator,
        io: &mut NavIo<'_>,
        cfg: &BypassCfg,
    ) -> Result<BypassStep> {
        if self.polls == 0 {
            straight(io, cfg.reacquire_speed)?;
        }
        // A left bypass rejoins with the line under the right sensor only.
        if read_line(io)?.only(side.mirrored()) {
            return Ok(BypassStep::Snap(side));
        }
        self.polls += 1;
        if self.polls < cfg.reacquire_max_polls {
            pause(io, cfg.reacquire_poll_ms);
            return Ok(BypassStep::Reacquire(side));
        }

        warn!(polls = self.polls, ?side, "line not reacquired");
        stop(io)?;
        if let Err(e) = io.remote.send_text(LINE_NOT_FOUND) {
            warn!(error = %e, "notice not delivered");
        }
        match cfg.on_reacquire_timeout {
            ReacquireTimeout::Resume => nav.set_state(NavState::Lost),
            ReacquireTimeout::Halt => io.kill.trip(&mut *io.remote, &mut *io.drive),
        }
        Ok(BypassStep::Done)
    }
}

fn read_line(io: &mut NavIo<'_>) -> Result<LineReading> {
    Ok(io.line.read().hw("reading line sensors")?.into())
}

fn pause(io: &NavIo<'_>, ms: u64) {
    io.clock.sleep(Duration::from_millis(ms));
}

fn stop(io: &mut NavIo<'_>) -> Result<()> {
    io.drive.stop_all().hw("stopping motors")
}

fn straight(io: &mut NavIo<'_>, speed: u8) -> Result<()> {
    io.drive
        .drive_left(speed, Direction::Forward)
        .hw("driving left wheel")?;
    io.drive
        .drive_right(speed, Direction::Forward)
        .hw("driving right wheel")
}

/// Pivot in place toward `toward` for `ms`.
fn pivot(io: &mut NavIo<'_>, toward: Side, speed: u8, ms: u64) -> Result<()> {
    spin(io, toward, speed)?;
    pause(io, ms);
    Ok(())
}

fn spin(io: &mut NavIo<'_>, toward: Side, speed: u8) -> Result<()> {
    let (left, right) = match toward {
        Side::Left => (Direction::Reverse, Direction::Forward),
        Side::Right => (Direction::Forward, Direction::Reverse),
    };
    io.drive.drive_left(speed, left).hw("driving left wheel")?;
    io.drive.drive_right(speed, right).hw("driving right wheel")
}

fn apply(io: &mut NavIo<'_>, motion: Motion, cfg: &BypassCfg) -> Result<()> {
    match motion {
        Motion::Forward => straight(io, cfg.cruise_speed),
        Motion::TurnLeft => spin(io, Side::Left, cfg.pivot_speed),
        Motion::TurnRight => spin(io, Side::Right, cfg.pivot_speed),
    }
}
