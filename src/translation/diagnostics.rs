use log::{debug, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::file_utils::FileManager;

/// What a provider returned when the unit count did not match
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MismatchDump {
    pub job_id: Uuid,
    pub chunk: usize,
    pub attempt: u32,
    pub expected: usize,
    pub actual: usize,
    pub source_units: Vec<String>,
    pub translated_units: Vec<String>,
}

impl MismatchDump {
    /// File name: job id, chunk and attempt make it unique
    pub fn file_name(&self) -> String {
        format!("{}-chunk{}-attempt{}.json", self.job_id, self.chunk, self.attempt)
    }
}

/// Receiver of mismatch dumps
///
/// Recording must not fail the job; implementations log their own errors.
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, dump: &MismatchDump);
}

/// Writes each dump as pretty JSON under a directory
#[derive(Debug, Clone)]
pub struct FileDiagnosticSink {
    dir: PathBuf,
}

impl FileDiagnosticSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DiagnosticSink for FileDiagnosticSink {
    fn record(&self, dump: &MismatchDump) {
        let path = self.dir.join(dump.file_name());
        let written = serde_json::to_string_pretty(dump)
            .map_err(anyhow::Error::from)
            .and_then(|json| FileManager::write_to_file(&path, &json));

        match written {
            Ok(()) => debug!("Wrote mismatch dump {:?}", path),
            Err(e) => warn!("Failed to write mismatch dump {:?}: {}", path, e),
        }
    }
}

/// Discards dumps
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _dump: &MismatchDump) {}
}

/// Keeps dumps in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    dumps: Mutex<Vec<MismatchDump>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dumps(&self) -> Vec<MismatchDump> {
        self.dumps.lock().clone()
    }
}

impl DiagnosticSink for MemorySink {
    fn record(&self, dump: &MismatchDump) {
        self.dumps.lock().push(dump.clone());
    }
}
