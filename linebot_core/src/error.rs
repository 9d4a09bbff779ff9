use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum RobotError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("timeout waiting for sensor")]
    Timeout,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing drive")]
    MissingDrive,
    #[error("missing line sensors")]
    MissingLineSensors,
    #[error("missing range finder")]
    MissingRangeFinder,
    #[error("missing imu")]
    MissingImu,
    #[error("missing record store")]
    MissingStore,
    #[error("missing remote")]
    MissingRemote,
    #[error("missing indicator")]
    MissingIndicator,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
