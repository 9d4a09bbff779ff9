pub mod clock;

pub use clock::{Clock, MonotonicClock, VirtualClock};

/// Error type crossing every hardware seam.
pub type HwResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Rotation sense of one wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }
}

/// Two-channel motor driver. Speeds are PWM duty values.
pub trait Drive {
    fn drive_left(&mut self, speed: u8, direction: Direction) -> HwResult<()>;
    fn drive_right(&mut self, speed: u8, direction: Direction) -> HwResult<()>;
    fn stop_left(&mut self) -> HwResult<()>;
    fn stop_right(&mut self) -> HwResult<()>;

    fn stop_all(&mut self) -> HwResult<()> {
        self.stop_left()?;
        self.stop_right()
    }
}

/// Pair of binary floor sensors; `true` means the sensor sees the line.
pub trait LineSensors {
    fn read(&mut self) -> HwResult<(bool, bool)>;
}

/// Time-of-flight ranger: sends one pulse and returns the echo width in
/// microseconds, or 0 when no echo arrived within `timeout`.
pub trait RangeFinder {
    fn echo_us(&mut self, timeout: std::time::Duration) -> HwResult<u32>;
}

/// Raw 3-axis accelerometer counts.
pub trait Imu {
    fn read_raw(&mut self) -> HwResult<[i16; 3]>;
}

/// Fixed-size record storage addressed in bytes (EEPROM style).
pub trait RecordStore {
    fn write_record(&mut self, address: u16, record: [f64; 3]) -> HwResult<()>;
    fn read_record(&mut self, address: u16) -> HwResult<[f64; 3]>;
    fn capacity_bytes(&self) -> usize;
}

/// Gamepad-style remote command source and text sink.
pub trait Remote {
    /// Currently pressed button code, `None` when nothing is pressed.
    fn button_code(&mut self) -> HwResult<Option<u8>>;
    fn steering_axis(&mut self) -> HwResult<i8>;
    fn throttle_axis(&mut self) -> HwResult<i8>;
    fn send_text(&mut self, text: &str) -> HwResult<()>;
}

/// Single binary status light.
pub trait Indicator {
    fn set(&mut self, on: bool) -> HwResult<()>;
}

impl<T: Drive + ?Sized> Drive for Box<T> {
    fn drive_left(&mut self, speed: u8, direction: Direction) -> HwResult<()> {
        (**self).drive_left(speed, direction)
    }
    fn drive_right(&mut self, speed: u8, direction: Direction) -> HwResult<()> {
        (**self).drive_right(speed, direction)
    }
    fn stop_left(&mut self) -> HwResult<()> {
        (**self).stop_left()
    }
    fn stop_right(&mut self) -> HwResult<()> {
        (**self).stop_right()
    }
    fn stop_all(&mut self) -> HwResult<()> {
        (**self).stop_all()
    }
}

impl<T: LineSensors + ?Sized> LineSensors for Box<T> {
    fn read(&mut self) -> HwResult<(bool, bool)> {
        (**self).read()
    }
}

impl<T: RangeFinder + ?Sized> RangeFinder for Box<T> {
    fn echo_us(&mut self, timeout: std::time::Duration) -> HwResult<u32> {
        (**self).echo_us(timeout)
    }
}

impl<T: Imu + ?Sized> Imu for Box<T> {
    fn read_raw(&mut self) -> HwResult<[i16; 3]> {
        (**self).read_raw()
    }
}

impl<T: RecordStore + ?Sized> RecordStore for Box<T> {
    fn write_record(&mut self, address: u16, record: [f64; 3]) -> HwResult<()> {
        (**self).write_record(address, record)
    }
    fn read_record(&mut self, address: u16) -> HwResult<[f64; 3]> {
        (**self).read_record(address)
    }
    fn capacity_bytes(&self) -> usize {
        (**self).capacity_bytes()
    }
}

impl<T: Remote + ?Sized> Remote for Box<T> {
    fn button_code(&mut self) -> HwResult<Option<u8>> {
        (**self).button_code()
    }
    fn steering_axis(&mut self) -> HwResult<i8> {
        (**self).steering_axis()
    }
    fn throttle_axis(&mut self) -> HwResult<i8> {
        (**self).throttle_axis()
    }
    fn send_text(&mut self, text: &str) -> HwResult<()> {
        (**self).send_text(text)
    }
}

impl<T: Indicator + ?Sized> Indicator for Box<T> {
    fn set(&mut self, on: bool) -> HwResult<()> {
        (**self).set(on)
    }
}
