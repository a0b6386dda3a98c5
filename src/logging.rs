//! Stderr logger for the `log` facade, optionally mirrored into a
//! timestamped file under `logs/`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use log::{LevelFilter, Log, Metadata, Record};

const LOG_DIR: &str = "logs";

struct Logger {
    level: LevelFilter,
    file: Option<Mutex<BufWriter<File>>>,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(Local::now(), record.level(), &record.args().to_string());
        eprintln!("{line}");
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = writeln!(f, "{line}");
                let _ = f.flush();
            }
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut f) = file.lock() {
                let _ = f.flush();
            }
        }
    }
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

fn format_line(now: DateTime<Local>, level: log::Level, message: &str) -> String {
    format!("[{} {:>5}] {}", now.format("%H:%M:%S%.3f"), level, message)
}

/// Parse a level name; unknown names fall back to `info`
pub fn parse_level(name: &str) -> LevelFilter {
    LevelFilter::from_str(name.trim()).unwrap_or(LevelFilter::Info)
}

fn open_log_file() -> Result<(PathBuf, BufWriter<File>)> {
    fs::create_dir_all(LOG_DIR).context("failed to create logs directory")?;
    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = PathBuf::from(LOG_DIR).join(format!("wrist_touch_{ts}.log"));
    let file = File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok((path, BufWriter::new(file)))
}

/// Install the logger. Returns the log file path when file output is on.
///
/// Only the first call installs anything; later calls return `Ok(None)`.
pub fn init(level: LevelFilter, to_file: bool) -> Result<Option<PathBuf>> {
    if LOGGER.get().is_some() {
        return Ok(None);
    }
    let (path, file) = if to_file {
        let (path, writer) = open_log_file()?;
        (Some(path), Some(Mutex::new(writer)))
    } else {
        (None, None)
    };
    let logger = LOGGER.get_or_init(|| Logger { level, file });
    // SetLoggerError is only a std Error with log's `std` feature
    log::set_logger(logger).map_err(|e| anyhow::anyhow!("logger install failed: {e}"))?;
    log::set_max_level(level);
    Ok(path)
}
