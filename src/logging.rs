//! Subscriber setup for the `git-graft` binary
//!
//! The library only emits `tracing` events; nothing is installed until the
//! binary calls [init].

use crate::config::LogConfig;
use tracing::level_filters::LevelFilter;

/// Level from config, moved by the command line: each `-v` is one step
/// more verbose, each `-q` one step quieter.
pub fn level_filter(config: &LogConfig, verbosity: i8) -> LevelFilter {
    const LEVELS: [LevelFilter; 6] = [
        LevelFilter::OFF,
        LevelFilter::ERROR,
        LevelFilter::WARN,
        LevelFilter::INFO,
        LevelFilter::DEBUG,
        LevelFilter::TRACE,
    ];

    let base = match config.level.to_ascii_lowercase().as_str() {
        "off" => 0,
        "error" => 1,
        "warn" | "warning" => 2,
        "debug" => 4,
        "trace" => 5,
        _ => 3,
    };
    let index = (base + i32::from(verbosity)).clamp(0, LEVELS.len() as i32 - 1);
    LEVELS[index as usize]
}

/// Install the global fmt subscriber writing to stderr.
///
/// Calling it twice is harmless; the second call keeps the first subscriber.
pub fn init(config: &LogConfig, verbosity: i8) {
    let level = level_filter(config, verbosity);
    if level == LevelFilter::OFF {
        return;
    }

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}
