//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use linebot_core::error::{BuildError, RobotError};

    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/linebot.toml for a sample."
            ),
            missing => format!(
                "What happened: The controller could not be assembled ({missing}).\nLikely causes: A peripheral failed to initialize or was not wired into the builder.\nHow to fix: Check the [pins] section and hardware connections, then rerun."
            ),
        };
    }

    if let Some(re) = err.downcast_ref::<RobotError>() {
        return match re {
            RobotError::Timeout => "What happened: A sensor read timed out.\nLikely causes: Ranger or IMU not wired correctly, or no power/ground.\nHow to fix: Verify the [pins] values and power, then rerun.".to_string(),
            RobotError::Storage(msg) => format!(
                "What happened: Telemetry storage failed ({msg}).\nLikely causes: storage.size_bytes does not match the image file, or telemetry.start_address is beyond it.\nHow to fix: Fix [storage]/[telemetry] in the config, or delete the image to start fresh."
            ),
            RobotError::HardwareFault(msg) => format!(
                "What happened: Hardware fault ({msg}).\nLikely causes: GPIO unavailable or insufficient permissions.\nHow to fix: Run on the target board with GPIO access and check [pins]."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("must be") || lower.contains("does not fit") || lower.contains("leaves no room") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range or inconsistent values in the TOML.\nHow to fix: Edit the config file and try again."
        );
    }

    if lower.contains("scenario") {
        return format!(
            "What happened: The scenario CSV could not be used ({msg}).\nLikely causes: Wrong headers, non-numeric fields, or rows out of time order.\nHow to fix: Use headers 't_ms,button,steer,throttle,left,right,echo_us,ax,ay,az' with rows sorted by t_ms."
        );
    }

    if lower.contains("pins") && lower.contains("missing") {
        return "What happened: Configuration is incomplete.\nLikely causes: The [pins] section is required with the hardware backend.\nHow to fix: Add [pins] to the TOML config and try again.".to_string();
    }

    let mut cause = String::new();
    if let Some(src) = err.chain().nth(1) {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Exit code for a failed command. Kill-switch halts are not errors and
/// map to their own code in `main`.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use linebot_core::error::BuildError;
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    1
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use linebot_core::error::{BuildError, RobotError};
    use serde_json::json;

    let reason = if err.downcast_ref::<BuildError>().is_some() {
        "Build"
    } else if let Some(re) = err.downcast_ref::<RobotError>() {
        match re {
            RobotError::Timeout => "Timeout",
            RobotError::Storage(_) => "Storage",
            RobotError::Hardware(_) | RobotError::HardwareFault(_) => "Hardware",
            RobotError::Config(_) => "Config",
        }
    } else {
        "Error"
    };
    json!({ "reason": reason, "message": humanize(err) }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use linebot_core::error::{BuildError, RobotError};

    #[test]
    fn typed_errors_get_specific_text() {
        let e = eyre::Report::new(RobotError::Timeout);
        assert!(humanize(&e).contains("sensor read timed out"));
        let e = eyre::Report::new(BuildError::MissingDrive);
        assert!(humanize(&e).contains("missing drive"));
        assert_eq!(exit_code_for_error(&e), 3);
    }

    #[test]
    fn json_error_carries_reason() {
        let e = eyre::Report::new(RobotError::Storage("bad".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&e)).unwrap();
        assert_eq!(v["reason"], "Storage");
        assert!(v["message"].as_str().unwrap().contains("storage failed"));
    }
}
