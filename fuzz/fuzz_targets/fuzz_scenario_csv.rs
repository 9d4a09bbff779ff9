#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(rows) = linebot_config::read_scenario(data) {
        assert!(rows.windows(2).all(|w| w[0].t_ms <= w[1].t_ms));
        assert!(rows.iter().all(|r| r.left <= 1 && r.right <= 1));
    }
});
