//! Raspberry Pi GPIO peripherals (rppal).
//!
//! - [`L298nDrive`]: dual H-bridge, software PWM on the enable pins
//! - [`Hcsr04`]: trigger/echo ultrasonic ranger
//! - [`IrLineSensors`]: two digital reflectance sensors
//! - [`GpioIndicator`]: status LED

use std::time::Duration;

use linebot_traits::{Direction, Drive, HwResult, Indicator, LineSensors, RangeFinder};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::wait_while_with_timeout;

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

fn output(gpio: &Gpio, pin: u8) -> Result<OutputPin> {
    Ok(gpio.get(pin).map_err(gpio_err)?.into_output_low())
}

fn input(gpio: &Gpio, pin: u8) -> Result<InputPin> {
    Ok(gpio.get(pin).map_err(gpio_err)?.into_input())
}

/// BCM pin numbers of one H-bridge channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelPins {
    pub enable: u8,
    pub in_a: u8,
    pub in_b: u8,
}

struct Channel {
    enable: OutputPin,
    in_a: OutputPin,
    in_b: OutputPin,
}

impl Channel {
    fn open(gpio: &Gpio, pins: ChannelPins) -> Result<Self> {
        Ok(Self {
            enable: output(gpio, pins.enable)?,
            in_a: output(gpio, pins.in_a)?,
            in_b: output(gpio, pins.in_b)?,
        })
    }

    fn run(&mut self, speed: u8, direction: Direction, pwm_hz: f64) -> Result<()> {
        match direction {
            Direction::Forward => {
                self.in_a.set_high();
                self.in_b.set_low();
            }
            Direction::Reverse => {
                self.in_a.set_low();
                self.in_b.set_high();
            }
        }
        let duty = f64::from(speed) / f64::from(u8::MAX);
        self.enable
            .set_pwm_frequency(pwm_hz, duty)
            .map_err(gpio_err)
    }

    fn stop(&mut self) -> Result<()> {
        self.enable.clear_pwm().map_err(gpio_err)?;
        self.enable.set_low();
        self.in_a.set_low();
        self.in_b.set_low();
        Ok(())
    }
}

pub struct L298nDrive {
    left: Channel,
    right: Channel,
    pwm_hz: f64,
}

impl L298nDrive {
    pub fn new(left: ChannelPins, right: ChannelPins, pwm_hz: f64) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        Ok(Self {
            left: Channel::open(&gpio, left)?,
            right: Channel::open(&gpio, right)?,
            pwm_hz,
        })
    }
}

impl Drive for L298nDrive {
    fn drive_left(&mut self, speed: u8, direction: Direction) -> HwResult<()> {
        trace!(speed, ?direction, "left channel");
        Ok(self.left.run(speed, direction, self.pwm_hz)?)
    }
    fn drive_right(&mut self, speed: u8, direction: Direction) -> HwResult<()> {
        trace!(speed, ?direction, "right channel");
        Ok(self.right.run(speed, direction, self.pwm_hz)?)
    }
    fn stop_left(&mut self) -> HwResult<()> {
        Ok(self.left.stop()?)
    }
    fn stop_right(&mut self) -> HwResult<()> {
        Ok(self.right.stop()?)
    }
}

pub struct Hcsr04 {
    trig: OutputPin,
    echo: InputPin,
}

impl Hcsr04 {
    pub fn new(trig_pin: u8, echo_pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        Ok(Self {
            trig: output(&gpio, trig_pin)?,
            echo: input(&gpio, echo_pin)?,
        })
    }

    fn pulse(&mut self, timeout: Duration) -> Result<u32> {
        self.trig.set_low();
        std::thread::sleep(Duration::from_micros(2));
        self.trig.set_high();
        std::thread::sleep(Duration::from_micros(10));
        self.trig.set_low();

        let echo = &self.echo;
        let rise = wait_while_with_timeout(|| echo.is_low(), timeout, Duration::ZERO)?;
        let fall = wait_while_with_timeout(|| echo.is_high(), timeout, Duration::ZERO)?;
        let width = fall.saturating_duration_since(rise).as_micros();
        Ok(width.min(u128::from(u32::MAX)) as u32)
    }
}

impl RangeFinder for Hcsr04 {
    fn echo_us(&mut self, timeout: Duration) -> HwResult<u32> {
        match self.pulse(timeout) {
            Ok(us) => {
                trace!(echo_us = us, "hcsr04 echo");
                Ok(us)
            }
            // Same contract as a timed-out pulse measurement: no echo reads as 0.
            Err(HwError::EchoTimeout) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

pub struct IrLineSensors {
    left: InputPin,
    right: InputPin,
    active_low: bool,
}

impl IrLineSensors {
    pub fn new(left_pin: u8, right_pin: u8, active_low: bool) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        Ok(Self {
            left: input(&gpio, left_pin)?,
            right: input(&gpio, right_pin)?,
            active_low,
        })
    }
}

impl LineSensors for IrLineSensors {
    fn read(&mut self) -> HwResult<(bool, bool)> {
        let on = |p: &InputPin| p.is_high() != self.active_low;
        Ok((on(&self.left), on(&self.right)))
    }
}

pub struct GpioIndicator {
    pin: OutputPin,
}

impl GpioIndicator {
    pub fn new(pin: u8) -> Result<Self> {
        let gpio = Gpio::new().map_err(gpio_err)?;
        Ok(Self {
            pin: output(&gpio, pin)?,
        })
    }
}

impl Indicator for GpioIndicator {
    fn set(&mut self, on: bool) -> HwResult<()> {
        if on {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
        Ok(())
    }
}
