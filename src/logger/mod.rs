//! Activity logging: JSONL append-only log with graceful degradation, gated by
//! the verbose toggle.

pub mod jsonl;

use std::path::PathBuf;

use self::jsonl::{JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Destination for activity entries.
pub trait LogSink {
    fn record(&mut self, entry: LogEntry);
}

/// In-memory sink, used by tests and by `--json` CLI output.
impl LogSink for Vec<LogEntry> {
    fn record(&mut self, entry: LogEntry) {
        self.push(entry);
    }
}

/// JSONL-backed sink. `Info` entries are written only in verbose mode;
/// warnings and critical entries always are.
pub struct ActivityLogger {
    writer: JsonlWriter,
    verbose: bool,
}

impl ActivityLogger {
    #[must_use]
    pub fn open(path: PathBuf, verbose: bool) -> Self {
        Self {
            writer: JsonlWriter::open(JsonlConfig::at(path)),
            verbose,
        }
    }

    #[must_use]
    pub const fn is_verbose(&self) -> bool {
        self.verbose
    }

    #[must_use]
    pub const fn state(&self) -> &'static str {
        self.writer.state()
    }

    pub fn flush(&mut self) {
        self.writer.flush();
    }
}

impl LogSink for ActivityLogger {
    fn record(&mut self, entry: LogEntry) {
        if entry.severity == Severity::Info && !self.verbose {
            return;
        }
        self.writer.write_entry(&entry);
    }
}
