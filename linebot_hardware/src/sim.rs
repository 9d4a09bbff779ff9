//! Simulated peripherals for host runs and tests.
//!
//! Two flavours are provided:
//! - scripted sources that replay a fixed sequence per read, repeating the
//!   last value once exhausted;
//! - a clock-driven [`Timeline`] that exposes whichever scenario frame is
//!   active at the current (possibly virtual) time.
//!
//! Actuator-side sims record what they were told through cloneable log
//! handles so callers can inspect the command stream after the fact.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use linebot_traits::{
    Clock, Direction, Drive, HwResult, Imu, Indicator, LineSensors, RangeFinder, Remote,
};

/// Replays `items` one per call, then keeps returning the last item.
#[derive(Debug, Clone)]
pub struct Script<T> {
    items: Vec<T>,
    idx: usize,
}

impl<T: Clone> Script<T> {
    pub fn new(items: impl Into<Vec<T>>) -> Self {
        Self {
            items: items.into(),
            idx: 0,
        }
    }

    pub fn next_item(&mut self) -> Option<T> {
        let last = self.items.len().checked_sub(1)?;
        let v = self.items[self.idx.min(last)].clone();
        self.idx = self.idx.saturating_add(1);
        Some(v)
    }

    /// Number of items handed out so far.
    pub fn reads(&self) -> usize {
        self.idx
    }
}

/// One actuator call as seen by [`SimulatedDrive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveCommand {
    Left { speed: u8, direction: Direction },
    Right { speed: u8, direction: Direction },
    StopLeft,
    StopRight,
    StopAll,
}

/// Shared, append-only record of items produced by a sim peripheral.
#[derive(Debug)]
pub struct Log<T>(Arc<Mutex<Vec<T>>>);

impl<T> Clone for Log<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Default for Log<T> {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(Vec::new())))
    }
}

impl<T: Clone> Log<T> {
    pub fn push(&self, item: T) {
        if let Ok(mut v) = self.0.lock() {
            v.push(item);
        }
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.0.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<T> {
        self.0.lock().ok().and_then(|v| v.last().cloned())
    }
}

pub type DriveLog = Log<DriveCommand>;
pub type TextLog = Log<String>;

/// Motor driver that only records commands.
#[derive(Debug, Default, Clone)]
pub struct SimulatedDrive {
    log: DriveLog,
}

impl SimulatedDrive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle onto the command log; stays valid after the drive is moved.
    pub fn log(&self) -> DriveLog {
        self.log.clone()
    }
}

impl Drive for SimulatedDrive {
    fn drive_left(&mut self, speed: u8, direction: Direction) -> HwResult<()> {
        tracing::trace!(speed, ?direction, "sim drive left");
        self.log.push(DriveCommand::Left { speed, direction });
        Ok(())
    }
    fn drive_right(&mut self, speed: u8, direction: Direction) -> HwResult<()> {
        tracing::trace!(speed, ?direction, "sim drive right");
        self.log.push(DriveCommand::Right { speed, direction });
        Ok(())
    }
    fn stop_left(&mut self) -> HwResult<()> {
        self.log.push(DriveCommand::StopLeft);
        Ok(())
    }
    fn stop_right(&mut self) -> HwResult<()> {
        self.log.push(DriveCommand::StopRight);
        Ok(())
    }
    fn stop_all(&mut self) -> HwResult<()> {
        self.log.push(DriveCommand::StopAll);
        Ok(())
    }
}

/// Line sensors replaying `(left, right)` pairs.
#[derive(Debug, Clone)]
pub struct ScriptedLineSensors(Script<(bool, bool)>);

impl ScriptedLineSensors {
    pub fn new(readings: impl Into<Vec<(bool, bool)>>) -> Self {
        Self(Script::new(readings))
    }

    /// Sensors that never see the line.
    pub fn clear() -> Self {
        Self::new([(false, false)])
    }
}

impl LineSensors for ScriptedLineSensors {
    fn read(&mut self) -> HwResult<(bool, bool)> {
        Ok(self.0.next_item().unwrap_or((false, false)))
    }
}

/// Echo widths in microseconds, one per pulse.
#[derive(Debug, Clone)]
pub struct ScriptedRangeFinder(Script<u32>);

impl ScriptedRangeFinder {
    pub fn new(echoes_us: impl Into<Vec<u32>>) -> Self {
        Self(Script::new(echoes_us))
    }

    /// Ranger returning the echo of an object `cm` away on every pulse.
    pub fn constant_cm(cm: f32) -> Self {
        Self::new([cm_to_echo_us(cm)])
    }
}

impl RangeFinder for ScriptedRangeFinder {
    fn echo_us(&mut self, _timeout: Duration) -> HwResult<u32> {
        Ok(self.0.next_item().unwrap_or(0))
    }
}

/// Round-trip echo width for an object `cm` away (speed of sound 343 m/s).
pub fn cm_to_echo_us(cm: f32) -> u32 {
    ((cm.max(0.0) * 2.0) / 0.0343).round() as u32
}

/// Accelerometer replaying raw count triples.
#[derive(Debug, Clone)]
pub struct ScriptedImu(Script<[i16; 3]>);

impl ScriptedImu {
    pub fn new(samples: impl Into<Vec<[i16; 3]>>) -> Self {
        Self(Script::new(samples))
    }
}

impl Imu for ScriptedImu {
    fn read_raw(&mut self) -> HwResult<[i16; 3]> {
        Ok(self.0.next_item().unwrap_or([0; 3]))
    }
}

/// Remote replaying button codes with fixed joystick axes.
#[derive(Debug, Clone)]
pub struct ScriptedRemote {
    buttons: Script<Option<u8>>,
    steering: i8,
    throttle: i8,
    sent: TextLog,
}

impl ScriptedRemote {
    pub fn new(buttons: impl Into<Vec<Option<u8>>>) -> Self {
        Self {
            buttons: Script::new(buttons),
            steering: 0,
            throttle: 0,
            sent: TextLog::default(),
        }
    }

    /// Remote on which nothing is ever pressed.
    pub fn idle() -> Self {
        Self::new([None])
    }

    pub fn with_axes(mut self, steering: i8, throttle: i8) -> Self {
        self.steering = steering;
        self.throttle = throttle;
        self
    }

    /// Handle onto every line passed to `send_text`.
    pub fn sent(&self) -> TextLog {
        self.sent.clone()
    }
}

impl Remote for ScriptedRemote {
    fn button_code(&mut self) -> HwResult<Option<u8>> {
        Ok(self.buttons.next_item().flatten())
    }
    fn steering_axis(&mut self) -> HwResult<i8> {
        Ok(self.steering)
    }
    fn throttle_axis(&mut self) -> HwResult<i8> {
        Ok(self.throttle)
    }
    fn send_text(&mut self, text: &str) -> HwResult<()> {
        self.sent.push(text.to_string());
        Ok(())
    }
}

/// Status light recording every level it is set to.
#[derive(Debug, Default, Clone)]
pub struct SimulatedIndicator {
    levels: Log<bool>,
}

impl SimulatedIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn levels(&self) -> Log<bool> {
        self.levels.clone()
    }
}

impl Indicator for SimulatedIndicator {
    fn set(&mut self, on: bool) -> HwResult<()> {
        self.levels.push(on);
        Ok(())
    }
}

/// World state the sim peripherals expose from `t_ms` onwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub t_ms: u64,
    pub button: Option<u8>,
    pub steer: i8,
    pub throttle: i8,
    pub left: bool,
    pub right: bool,
    pub echo_us: u32,
    pub accel: [i16; 3],
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            t_ms: 0,
            button: None,
            steer: 0,
            throttle: 0,
            left: false,
            right: false,
            // nothing within a metre
            echo_us: cm_to_echo_us(100.0),
            accel: [0, 0, 16384],
        }
    }
}

/// Scenario frames indexed by elapsed clock time.
pub struct Timeline {
    frames: Vec<Frame>,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl std::fmt::Debug for Timeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeline")
            .field("frames", &self.frames.len())
            .finish()
    }
}

impl Timeline {
    /// Frames are sorted by `t_ms`; the epoch is the clock's current time.
    pub fn new(mut frames: Vec<Frame>, clock: Arc<dyn Clock + Send + Sync>) -> Arc<Self> {
        frames.sort_by_key(|f| f.t_ms);
        let epoch = clock.now();
        Arc::new(Self {
            frames,
            clock,
            epoch,
        })
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// Latest frame whose `t_ms` is not in the future; the first frame
    /// before the scenario starts.
    pub fn current(&self) -> Frame {
        let now = self.elapsed_ms();
        let idx = self.frames.partition_point(|f| f.t_ms <= now);
        self.frames
            .get(idx.saturating_sub(1))
            .copied()
            .unwrap_or_default()
    }

    /// True once the clock has passed the last frame.
    pub fn finished(&self) -> bool {
        self.frames
            .last()
            .is_none_or(|f| self.elapsed_ms() >= f.t_ms)
    }
}

/// Remote, line sensors, ranger and IMU backed by a shared [`Timeline`].
#[derive(Debug, Clone)]
pub struct TimelinePort {
    timeline: Arc<Timeline>,
    sent: TextLog,
    echo_stdout: bool,
}

impl TimelinePort {
    pub fn new(timeline: Arc<Timeline>) -> Self {
        Self {
            timeline,
            sent: TextLog::default(),
            echo_stdout: false,
        }
    }

    /// Also print every remote text line on stdout.
    pub fn echo_stdout(mut self, on: bool) -> Self {
        self.echo_stdout = on;
        self
    }

    pub fn sent(&self) -> TextLog {
        self.sent.clone()
    }

    pub fn timeline(&self) -> &Arc<Timeline> {
        &self.timeline
    }
}

impl Remote for TimelinePort {
    fn button_code(&mut self) -> HwResult<Option<u8>> {
        Ok(self.timeline.current().button)
    }
    fn steering_axis(&mut self) -> HwResult<i8> {
        Ok(self.timeline.current().steer)
    }
    fn throttle_axis(&mut self) -> HwResult<i8> {
        Ok(self.timeline.current().throttle)
    }
    fn send_text(&mut self, text: &str) -> HwResult<()> {
        if self.echo_stdout {
            println!("{text}");
        }
        self.sent.push(text.to_string());
        Ok(())
    }
}

impl LineSensors for TimelinePort {
    fn read(&mut self) -> HwResult<(bool, bool)> {
        let f = self.timeline.current();
        Ok((f.left, f.right))
    }
}

impl RangeFinder for TimelinePort {
    fn echo_us(&mut self, _timeout: Duration) -> HwResult<u32> {
        Ok(self.timeline.current().echo_us)
    }
}

impl Imu for TimelinePort {
    fn read_raw(&mut self) -> HwResult<[i16; 3]> {
        Ok(self.timeline.current().accel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linebot_traits::VirtualClock;

    #[test]
    fn script_repeats_last_item() {
        let mut s = Script::new([1, 2]);
        assert_eq!(s.next_item(), Some(1));
        assert_eq!(s.next_item(), Some(2));
        assert_eq!(s.next_item(), Some(2));
        assert_eq!(s.reads(), 3);
        assert_eq!(Script::<u8>::new(Vec::new()).next_item(), None);
    }

    #[test]
    fn timeline_follows_virtual_time() {
        let clock = Arc::new(VirtualClock::new());
        let frames = vec![
            Frame {
                t_ms: 100,
                left: true,
                ..Frame::default()
            },
            Frame::default(),
        ];
        let tl = Timeline::new(frames, clock.clone());
        assert!(!tl.current().left);
        clock.advance(Duration::from_millis(100));
        assert!(tl.current().left);
        assert!(tl.finished());
    }

    #[test]
    fn echo_conversion_matches_speed_of_sound() {
        // 20 cm there and back at 0.0343 cm/us
        assert_eq!(cm_to_echo_us(20.0), 1166);
    }
}
