use std::time::Duration;

use linebot_core::config::{BypassCfg, LineFollowCfg, RangingCfg};
use linebot_core::kill_switch::KillSwitch;
use linebot_core::navigation::line_follow::eased;
use linebot_core::navigation::{NavIo, Navigator};
use linebot_core::ranging::RangingSampler;
use linebot_core::{LineReading, Maneuver, NavState};
use linebot_hardware::{
    DriveCommand, ScriptedLineSensors, ScriptedRangeFinder, ScriptedRemote, SimulatedDrive,
};
use linebot_traits::{Direction, VirtualClock};
use rstest::rstest;

struct Harness {
    nav: Navigator,
    drive: SimulatedDrive,
    line: ScriptedLineSensors,
    ranger: ScriptedRangeFinder,
    remote: ScriptedRemote,
    clock: VirtualClock,
    ranging: RangingSampler,
    kill: KillSwitch,
}

impl Harness {
    fn new() -> Self {
        Self {
            nav: Navigator::new(LineFollowCfg::default(), BypassCfg::default(), 15.0),
            drive: SimulatedDrive::new(),
            line: ScriptedLineSensors::clear(),
            ranger: ScriptedRangeFinder::constant_cm(100.0),
            remote: ScriptedRemote::idle(),
            clock: VirtualClock::new(),
            ranging: RangingSampler::new(RangingCfg::default()),
            kill: KillSwitch::new(),
        }
    }

    /// One clear-road cycle with the given sensor pair; returns the two
    /// wheel commands issued.
    fn cycle(&mut self, left: bool, right: bool) -> (DriveCommand, DriveCommand) {
        let log = self.drive.log();
        let before = log.len();
        let mut io = NavIo {
            drive: &mut self.drive,
            line: &mut self.line,
            ranger: &mut self.ranger,
            remote: &mut self.remote,
            clock: &self.clock,
            ranging: &mut self.ranging,
            kill: &mut self.kill,
        };
        let m = self
            .nav
            .autonomous_step(LineReading::new(left, right), 100.0, &mut io)
            .unwrap();
        assert_eq!(m, Maneuver::Continue);
        let cmds = log.snapshot();
        assert_eq!(cmds.len(), before + 2);
        (cmds[before], cmds[before + 1])
    }
}

fn left(speed: u8, direction: Direction) -> DriveCommand {
    DriveCommand::Left { speed, direction }
}

fn right(speed: u8, direction: Direction) -> DriveCommand {
    DriveCommand::Right { speed, direction }
}

#[rstest]
#[case(false, false, NavState::Forward, left(199, Direction::Forward), right(199, Direction::Forward))]
#[case(true, false, NavState::TurnLeft, left(150, Direction::Reverse), right(255, Direction::Forward))]
#[case(false, true, NavState::TurnRight, left(255, Direction::Forward), right(150, Direction::Reverse))]
#[case(true, true, NavState::Lost, left(180, Direction::Forward), right(180, Direction::Reverse))]
fn first_cycle_per_branch(
    #[case] l: bool,
    #[case] r: bool,
    #[case] state: NavState,
    #[case] expect_left: DriveCommand,
    #[case] expect_right: DriveCommand,
) {
    let mut h = Harness::new();
    let (a, b) = h.cycle(l, r);
    assert_eq!(h.nav.state(), state);
    assert_eq!((a, b), (expect_left, expect_right));
}

#[test]
fn forward_decays_to_floor_and_holds() {
    let mut h = Harness::new();
    for i in 1..=60u8 {
        h.cycle(false, false);
        assert_eq!(h.nav.ramp(), i);
    }
    assert_eq!(h.cycle(false, false).0, left(120, Direction::Forward));
    assert_eq!(h.nav.ramp(), 60);
}

#[test]
fn ramp_delay_only_while_ramping() {
    let mut h = Harness::new();
    for _ in 0..60 {
        h.cycle(false, false);
    }
    assert_eq!(h.clock.elapsed(), Duration::from_millis(60 * 5));
    h.cycle(false, false);
    assert_eq!(h.clock.elapsed(), Duration::from_millis(60 * 5));
}

#[test]
fn state_change_resets_ramp_without_delay() {
    let mut h = Harness::new();
    for _ in 0..10 {
        h.cycle(false, false);
    }
    let t = h.clock.elapsed();
    let (a, b) = h.cycle(true, false);
    assert_eq!(h.nav.ramp(), 0);
    assert_eq!(h.clock.elapsed(), t);
    assert_eq!(a, left(150, Direction::Reverse));
    assert_eq!(b, right(255, Direction::Forward));
}

#[test]
fn lost_spin_caps_at_thirty() {
    let mut h = Harness::new();
    for _ in 0..40 {
        h.cycle(true, true);
    }
    assert_eq!(h.nav.state(), NavState::Lost);
    assert_eq!(h.nav.ramp(), 30);
    let (a, b) = h.cycle(true, true);
    assert_eq!(a, left(100, Direction::Forward));
    assert_eq!(b, right(100, Direction::Reverse));
}

#[test]
fn turn_inner_wheel_eases_to_floor() {
    let mut h = Harness::new();
    h.cycle(false, true);
    for _ in 0..30 {
        h.cycle(false, true);
    }
    let (a, b) = h.cycle(false, true);
    assert_eq!(a, left(255, Direction::Forward));
    let expected = eased(150, 60, h.nav.ramp(), 60);
    assert_eq!(b, right(expected, Direction::Reverse));
    assert_eq!(h.nav.ramp(), 31);
}
