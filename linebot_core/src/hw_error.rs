//! Maps `Box<dyn Error>` from trait boundaries to typed `RobotError`.
//!
//! The traits in `linebot_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `linebot_hardware::HwError` downcasting.

use eyre::WrapErr;
use linebot_traits::HwResult;

use crate::error::{Result, RobotError};

/// Map a trait-boundary error to a typed `RobotError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> RobotError {
    #[cfg(feature = "hardware-errors")]
    {
        use linebot_hardware::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::EchoTimeout => RobotError::Timeout,
                HwError::AddressOutOfRange { .. } | HwError::Corrupt(_) | HwError::Io(_) => {
                    RobotError::Storage(hw.to_string())
                }
                HwError::Gpio(_) => RobotError::HardwareFault(hw.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        RobotError::Timeout
    } else {
        RobotError::Hardware(s)
    }
}

/// Attach typed mapping plus a short context to a trait-boundary result.
pub(crate) trait HwContext<T> {
    fn hw(self, context: &'static str) -> Result<T>;
}

impl<T> HwContext<T> for HwResult<T> {
    #[inline]
    fn hw(self, context: &'static str) -> Result<T> {
        self.map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_fallback_detects_timeouts() {
        let e = std::io::Error::other("sensor Timeout on read");
        assert!(matches!(map_hw_error(&e), RobotError::Timeout));
        let e = std::io::Error::other("bus glitch");
        assert!(matches!(map_hw_error(&e), RobotError::Hardware(_)));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn downcasts_store_errors() {
        let e = linebot_hardware::HwError::AddressOutOfRange {
            address: 9,
            len: 24,
            capacity: 16,
        };
        assert!(matches!(map_hw_error(&e), RobotError::Storage(_)));
    }
}
