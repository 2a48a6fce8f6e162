// File: args.rs
use clap::{Parser, ValueEnum};
use tracing::level_filters::LevelFilter;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum LogLevel {
    Trace = 0, // Designates very fine-grained informational events, extremely verbose.
    Debug = 1, // Designates fine-grained informational events.
    Info = 2, // Designates informational messages.
    Warn = 3, // Designates hazardous situations.
    Error = 4, // Designates very serious errors.
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = "A headless client that plays a DASH stream with adaptive bitrate selection.")]
pub struct Args {
    #[arg(short, long, default_value = "https://dash.akamaized.net/akamai/bbb_30fps/bbb_30fps.mpd")]
    pub manifest_url: String,
    /// Seconds of buffer to keep ahead of the playback position.
    #[arg(long, default_value = "10.0")]
    pub lookahead: f64,
    /// Number of fetch samples in the bandwidth estimation window.
    #[arg(short, long, default_value = "10")]
    pub window: usize,
    /// Scheduling tick interval in milliseconds.
    #[arg(short, long, default_value = "125")]
    pub interval_ms: u64,
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

pub fn parse_args() -> Args {
    Args::parse()
}

pub fn get_log_level_filter(args: &Args) -> LevelFilter {
    // Map the LogLevel enum to the LevelFilter enum
    match args.log_level {
        LogLevel::Trace => LevelFilter::TRACE,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Error => LevelFilter::ERROR,
    }
}
