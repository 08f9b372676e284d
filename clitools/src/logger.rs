use std::io::{self, Write};

use colored::Colorize;
use log::{Level, LevelFilter, Metadata, Record};

/// Logger writing to stderr, so the tools can be used in pipes
pub struct StderrLogger {
    max_level: LevelFilter,
}

impl StderrLogger {
    pub fn new(quiet: bool, verbose: u8) -> Self {
        let max_level = match (quiet, verbose) {
            (true, _) => LevelFilter::Error,
            (false, 0) => LevelFilter::Info,
            (false, 1) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        };
        Self { max_level }
    }
}

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error => eprintln!("{} {}", "[ERROR]".red().bold(), record.args()),
            Level::Warn => eprintln!("{} {}", "[WARN]".yellow().bold(), record.args()),
            Level::Info => eprintln!("{} {}", "[INFO]".blue(), record.args()),
            level => eprintln!(
                "[{}] {}: {}",
                level.to_string().dimmed(),
                record.target(),
                record.args()
            ),
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
    }
}

pub fn init(quiet: bool, verbose: u8) -> Result<(), log::SetLoggerError> {
    let logger = StderrLogger::new(quiet, verbose);
    let level = logger.max_level;
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level);
    Ok(())
}
