//! `log` backend writing to stderr or a file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;

use crate::args::Verbosity;

enum Output {
    Stderr,
    File(BufWriter<File>),
}

pub struct Logger {
    output: Mutex<Output>,
    level: LevelFilter,
    started: Instant,
}

impl Logger {
    pub fn stderr(verbosity: Verbosity) -> Self {
        Self::with_output(Output::Stderr, verbosity)
    }

    pub fn file(path: &Path, verbosity: Verbosity) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self::with_output(Output::File(BufWriter::new(file)), verbosity))
    }

    fn with_output(output: Output, verbosity: Verbosity) -> Self {
        Self {
            output: Mutex::new(output),
            level: level_for(verbosity),
            started: Instant::now(),
        }
    }

    fn format(&self, record: &Record) -> String {
        let elapsed = self.started.elapsed().as_secs_f64();
        format!("[{elapsed:9.3}s {:<5}] {}", record.level(), record.args())
    }
}

pub fn level_for(verbosity: Verbosity) -> LevelFilter {
    match verbosity {
        Verbosity::Quiet => LevelFilter::Warn,
        Verbosity::Normal => LevelFilter::Info,
        Verbosity::Verbose => LevelFilter::Debug,
        Verbosity::Trace => LevelFilter::Trace,
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = self.format(record);
        match &mut *self.output.lock() {
            Output::Stderr => eprintln!("{line}"),
            Output::File(f) => {
                let _ = writeln!(f, "{line}");
                let _ = f.flush();
            }
        }
    }

    fn flush(&self) {
        if let Output::File(f) = &mut *self.output.lock() {
            let _ = f.flush();
        }
    }
}

pub fn init(verbosity: Verbosity, log_file: Option<&Path>) -> anyhow::Result<()> {
    let logger = match log_file {
        Some(path) => Logger::file(path, verbosity)?,
        None => Logger::stderr(verbosity),
    };
    let level = logger.level;
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level);
    Ok(())
}
