#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parsing and validation may reject the input but must never panic.
    if let Ok(cfg) = linebot_config::load_toml(data) {
        let _ = cfg.validate();
        let _ = cfg.telemetry.lowest_slot_address();
    }
});
