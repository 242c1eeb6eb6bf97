use std::io::Write;
use std::str::FromStr;

use cx_core::CodexError;
use log::{LevelFilter, Log, Metadata, Record};

/// Writes diagnostics to stderr so stdout stays a clean protocol stream.
struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:<5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

pub(crate) fn parse_log_level(raw: &str) -> Result<LevelFilter, CodexError> {
    LevelFilter::from_str(raw.trim()).map_err(|_| {
        CodexError::new(
            "CLI_LOG_LEVEL",
            format!(
                "Unknown log level \"{}\" (expected off, error, warn, info, debug or trace)",
                raw
            ),
        )
    })
}

/// Installs the stderr logger once per process. Later calls only move the
/// level.
pub(crate) fn init_logger(raw_level: &str) -> Result<(), CodexError> {
    let level = parse_log_level(raw_level)?;
    if log::set_logger(&LOGGER).is_err() {
        log::debug!("Logger already installed, updating level only");
    }
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod logger_tests {
    use super::*;

    #[test]
    fn parse_log_level_accepts_names_case_insensitively() {
        assert_eq!(parse_log_level("warn").expect("warn"), LevelFilter::Warn);
        assert_eq!(parse_log_level("DEBUG").expect("debug"), LevelFilter::Debug);
        assert_eq!(parse_log_level(" off ").expect("off"), LevelFilter::Off);
        assert_eq!(
            parse_log_level("loud").expect_err("unknown level").code,
            "CLI_LOG_LEVEL"
        );
    }

    #[test]
    fn init_logger_can_run_twice() {
        init_logger("error").expect("first init");
        init_logger("warn").expect("second init");
        assert_eq!(log::max_level(), LevelFilter::Warn);
    }
}
