//! Joystick to differential wheel speeds.

use linebot_traits::{Direction, Drive};

use crate::config::ManualCfg;
use crate::error::Result;
use crate::hw_error::HwContext;

#[derive(Debug, Clone)]
pub struct ManualDriveMapper {
    axis_max: i8,
    max_speed: u8,
}

impl ManualDriveMapper {
    pub fn new(cfg: &ManualCfg) -> Self {
        Self {
            axis_max: cfg.axis_max.max(1),
            max_speed: cfg.max_speed,
        }
    }

    /// Signed wheel speeds in `-max_speed..=max_speed` for the given axes.
    ///
    /// Arcade mixing: left = throttle + steering, right = throttle - steering,
    /// scaled back so neither side exceeds full speed.
    pub fn mix(&self, steering: i8, throttle: i8) -> (i16, i16) {
        let m = self.axis_max;
        let unit = |v: i8| f32::from(v.clamp(-m, m)) / f32::from(m);
        let (s, t) = (unit(steering), unit(throttle));

        let mut left = t + s;
        let mut right = t - s;
        let peak = left.abs().max(right.abs());
        if peak > 1.0 {
            left /= peak;
            right /= peak;
        }
        let max = f32::from(self.max_speed);
        ((left * max).round() as i16, (right * max).round() as i16)
    }

    pub fn drive(&self, steering: i8, throttle: i8, drive: &mut dyn Drive) -> Result<()> {
        let (left, right) = self.mix(steering, throttle);
        tracing::trace!(steering, throttle, left, right, "manual drive");
        let l = match split(left) {
            Some((speed, dir)) => drive.drive_left(speed, dir),
            None => drive.stop_left(),
        };
        l.hw("driving left wheel")?;
        let r = match split(right) {
            Some((speed, dir)) => drive.drive_right(speed, dir),
            None => drive.stop_right(),
        };
        r.hw("driving right wheel")
    }
}

fn split(v: i16) -> Option<(u8, Direction)> {
    let dir = if v < 0 {
        Direction::Reverse
    } else {
        Direction::Forward
    };
    let speed = v.unsigned_abs().min(u16::from(u8::MAX)) as u8;
    (speed > 0).then_some((speed, dir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use linebot_hardware::{DriveCommand, SimulatedDrive};
    use rstest::rstest;

    #[rstest]
    #[case(0, 0, (0, 0))]
    #[case(0, 7, (255, 255))]
    #[case(0, -7, (-255, -255))]
    #[case(7, 0, (255, -255))]
    #[case(-7, 0, (-255, 255))]
    #[case(7, 7, (255, 0))]
    #[case(0, 100, (255, 255))]
    fn mixes_axes(#[case] steer: i8, #[case] throttle: i8, #[case] expected: (i16, i16)) {
        let m = ManualDriveMapper::new(&ManualCfg::default());
        assert_eq!(m.mix(steer, throttle), expected);
    }

    #[test]
    fn centred_stick_stops_both_wheels() {
        let m = ManualDriveMapper::new(&ManualCfg::default());
        let mut d = SimulatedDrive::new();
        let log = d.log();
        m.drive(0, 0, &mut d).unwrap();
        assert_eq!(log.snapshot(), vec![DriveCommand::StopLeft, DriveCommand::StopRight]);
    }

    #[test]
    fn reverse_throttle_reverses_both() {
        let m = ManualDriveMapper::new(&ManualCfg::default());
        let mut d = SimulatedDrive::new();
        let log = d.log();
        m.drive(0, -7, &mut d).unwrap();
        assert_eq!(
            log.snapshot(),
            vec![
                DriveCommand::Left { speed: 255, direction: Direction::Reverse },
                DriveCommand::Right { speed: 255, direction: Direction::Reverse },
            ]
        );
    }
}
