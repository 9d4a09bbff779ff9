use linebot_hardware::error::HwError;
use linebot_hardware::util::wait_while_with_timeout;
use std::cell::Cell;
use std::time::Duration;

#[test]
fn returns_once_level_drops() {
    let polls = Cell::new(0u32);
    let res = wait_while_with_timeout(
        || {
            polls.set(polls.get() + 1);
            polls.get() < 3
        },
        Duration::from_millis(200),
        Duration::from_millis(1),
    );
    assert!(res.is_ok());
    assert_eq!(polls.get(), 3);
}

#[test]
fn times_out_while_level_stays_up() {
    let res = wait_while_with_timeout(|| true, Duration::from_millis(10), Duration::ZERO);
    assert!(matches!(res, Err(HwError::EchoTimeout)));
}
