use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// Wait while `level()` keeps returning `true`, or until `timeout` expires.
/// Returns the instant the level dropped. A zero `poll_interval` busy-spins,
/// which is what microsecond echo timing needs.
pub fn wait_while_with_timeout(
    mut level: impl FnMut() -> bool,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Instant> {
    let deadline = Instant::now() + timeout;
    while level() {
        if Instant::now() >= deadline {
            return Err(HwError::EchoTimeout);
        }
        if poll_interval.is_zero() {
            std::hint::spin_loop();
        } else {
            std::thread::sleep(poll_interval);
        }
    }
    Ok(Instant::now())
}
