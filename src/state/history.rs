use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::record::{Classification, InspectionRecord};
use crate::error::{InspectError, Result};

/// One line of the scan log
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Local wall-clock time, "HH:MM:SS"
    pub time: String,
    /// File name only
    pub file: String,
    pub confidence: f64,
    /// "CRACK" or "SAFE"
    pub result: Classification,
}

impl HistoryEntry {
    /// Entry for a classified record; unknown results are never logged
    pub fn from_record(record: &InspectionRecord) -> Option<Self> {
        if record.is_unknown() {
            return None;
        }

        Some(Self {
            time: record.timestamp.format("%H:%M:%S").to_string(),
            file: record.filename(),
            confidence: record.confidence as f64,
            result: record.classification,
        })
    }
}

/// The HistoryStore keeps the scan log, newest first, as a JSON array on disk.
///
/// Durability is best effort: a failed save is reported but the in-memory
/// log is still updated, and an absent or corrupt file reads as empty.
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    path: PathBuf,
}

impl HistoryStore {
    /// Open the store at `path`, loading whatever is there
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::read_or_empty(&path);

        tracing::info!(
            "📁 Scan history at {} ({} entries)",
            path.display(),
            entries.len()
        );

        HistoryStore { entries, path }
    }

    /// Get the path to the history file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries, newest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-read the file, replacing the in-memory log.
    ///
    /// Without a file on disk (e.g. every save so far failed) the in-memory
    /// log is kept as it is.
    pub fn reload(&mut self) {
        if !self.path.exists() {
            return;
        }
        self.entries = Self::read_or_empty(&self.path);
    }

    /// Put an entry at the front and persist the whole log
    pub fn record(&mut self, entry: HistoryEntry) -> Result<()> {
        self.entries.insert(0, entry);
        self.save()
    }

    /// Write the log as a 4-space indented JSON array
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| InspectError::io(parent, e))?;
            }
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.entries
            .serialize(&mut serializer)
            .map_err(|e| InspectError::Persistence {
                path: self.path.clone(),
                source: e,
            })?;

        fs::write(&self.path, buf).map_err(|e| InspectError::io(&self.path, e))
    }

    /// Read the log from disk
    pub fn read(path: &Path) -> Result<Vec<HistoryEntry>> {
        let json = fs::read_to_string(path).map_err(|e| InspectError::io(path, e))?;
        serde_json::from_str(&json).map_err(|e| InspectError::Persistence {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn read_or_empty(path: &Path) -> Vec<HistoryEntry> {
        if !path.exists() {
            return Vec::new();
        }

        match Self::read(path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("⚠️  Starting with empty history: {}", e);
                Vec::new()
            }
        }
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .finish()
    }
}
