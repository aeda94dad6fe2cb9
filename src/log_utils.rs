use std::path::*;
use flexi_logger::{Duplicate, FileSpec, Logger, LoggerHandle};

/// Parses a log level name (DEBUG, INFO, WARN, FATAL, any case) or an
/// integer threshold (< 0 debug, 0..9 info, 10..19 warn, 20+ errors only).
pub fn parse_log_level(text: &str) -> anyhow::Result<log::LevelFilter> {
    match text.to_ascii_uppercase().as_str() {
        "DEBUG" => return Ok(log::LevelFilter::Debug),
        "INFO"  => return Ok(log::LevelFilter::Info),
        "WARN"  => return Ok(log::LevelFilter::Warn),
        "FATAL" => return Ok(log::LevelFilter::Error),
        _ => (),
    }
    if let Ok(value) = text.parse::<i32>() {
        let level = match value {
            v if v < 0 => log::LevelFilter::Debug,
            0..=9      => log::LevelFilter::Info,
            10..=19    => log::LevelFilter::Warn,
            _          => log::LevelFilter::Error,
        };
        return Ok(level);
    }
    anyhow::bail!("Unrecognized log level `{}`", text)
}

fn level_spec(level: log::LevelFilter) -> &'static str {
    match level {
        log::LevelFilter::Off   => "off",
        log::LevelFilter::Error => "error",
        log::LevelFilter::Warn  => "warn",
        log::LevelFilter::Info  => "info",
        log::LevelFilter::Debug => "debug",
        log::LevelFilter::Trace => "trace",
    }
}

/// Extracts the logging options from raw arguments before real argument
/// parsing happens, so that log lines written during argument resolution
/// are not lost. Bad values are left for the real parser to report.
pub fn logging_from_args(args: &[String]) -> (log::LevelFilter, Option<PathBuf>) {
    let mut level = log::LevelFilter::Info;
    let mut dest: Option<PathBuf> = None;
    let mut debug = false;

    let mut iter = args.iter().peekable();
    while let Some(arg) = iter.next() {
        if arg == "--debug" {
            debug = true;
        } else if arg == "--loglevel" {
            if let Some(value) = iter.peek() {
                if let Ok(parsed) = parse_log_level(value) {
                    level = parsed;
                }
            }
        } else if let Some(value) = arg.strip_prefix("--loglevel=") {
            if let Ok(parsed) = parse_log_level(value) {
                level = parsed;
            }
        } else if arg == "--logdest" {
            if let Some(value) = iter.peek() {
                dest = Some(PathBuf::from(value));
            }
        } else if let Some(value) = arg.strip_prefix("--logdest=") {
            dest = Some(PathBuf::from(value));
        }
    }

    if debug {
        level = log::LevelFilter::Debug;
    }
    (level, dest)
}

/// Starts the logger. The returned handle must stay alive for the
/// whole program run.
pub fn start_logger(
    level:    log::LevelFilter,
    log_dest: Option<&Path>
) -> anyhow::Result<LoggerHandle> {
    let logger = Logger::try_with_str(level_spec(level))?;
    let handle = match log_dest {
        Some(path) =>
            logger
                .log_to_file(FileSpec::try_from(path)?)
                .duplicate_to_stderr(Duplicate::All)
                .start()?,
        None =>
            logger
                .log_to_stderr()
                .start()?,
    };
    Ok(handle)
}

pub struct TimeLogger {
    start_time: std::time::Instant,
}

impl TimeLogger {
    pub fn start() -> TimeLogger {
        TimeLogger { start_time: std::time::Instant::now() }
    }

    pub fn log(self, text: &str) {
        let time = self.start_time.elapsed().as_secs_f64();
        log::info!("BENCH {} time = {:.6} s", text, time);
    }
}
