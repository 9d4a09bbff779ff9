//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "linebot", version, about = "Line-following robot controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/linebot.toml")]
    pub config: PathBuf,

    /// Log and print results as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop
    Run {
        /// Scenario CSV driving the simulated remote and sensors
        #[arg(long, value_name = "CSV")]
        scenario: Option<PathBuf>,
        /// Stop after this many control cycles
        #[arg(long, value_name = "N")]
        max_cycles: Option<u64>,
        /// Use a virtual clock: sleeps advance time instantly
        #[arg(long, action = ArgAction::SetTrue)]
        virtual_time: bool,
        /// Enable real-time mode (SCHED_FIFO, mlockall)
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Enable real-time mode on Linux: SCHED_FIFO priority and mlockall(MCL_CURRENT|MCL_FUTURE). Needs CAP_SYS_NICE/CAP_IPC_LOCK or root; failures are reported as warnings and the run continues."
        )]
        rt: bool,
        /// Real-time priority for SCHED_FIFO (1..=max)
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
    },
    /// Validate config, build the robot on simulated peripherals, run one cycle
    SelfCheck,
    /// Print telemetry records persisted in the storage file
    Report {
        /// Number of slots to read (default: telemetry.capacity)
        #[arg(long, value_name = "N")]
        count: Option<u16>,
    },
}
