use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("echo timeout")]
    EchoTimeout,
    #[error("record address {address} (+{len} bytes) outside storage of {capacity} bytes")]
    AddressOutOfRange {
        address: u16,
        len: usize,
        capacity: usize,
    },
    #[error("storage image corrupt: {0}")]
    Corrupt(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
