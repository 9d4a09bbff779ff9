#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Control logic for a two-wheeled line-following robot (hardware-agnostic).
//!
//! All hardware goes through the traits in `linebot_traits`. A [`Robot`]
//! runs one cooperative control cycle per [`Robot::step`]:
//!
//! - **Kill switch**: latched halt, checked first and inside every bypass step
//! - **Mode arbiter**: manual/autonomous toggle on button edges
//! - **Navigation**: line-follow table with speed easing, obstacle bypass
//! - **Manual**: joystick mixing to wheel speeds
//! - **Telemetry**: accelerometer peaks, persisted on demand

pub mod builder;
pub mod config;
pub mod conversions;
pub mod error;
pub mod hw_error;
pub mod kill_switch;
pub mod manual;
pub mod mode;
pub mod navigation;
pub mod ranging;
pub mod robot;
pub mod runner;
pub mod sampler;
pub mod schedule;
pub mod status;
pub mod telemetry;
pub mod types;

pub use builder::RobotBuilder;
pub use config::{
    BypassCfg, LineFollowCfg, ManualCfg, ModeCfg, RangingCfg, ReacquireTimeout, RobotConfig,
    TelemetryCfg,
};
pub use error::{BuildError, RobotError};
pub use robot::Robot;
pub use runner::{RunLimits, RunOutcome};
pub use status::{CycleStatus, Maneuver};
pub use types::{Button, Distance, LineReading, LineState, NavState, OperatingMode, PeakG, RangeSample, Side};
