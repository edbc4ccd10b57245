/// Batch ("drone survey") runs
///
/// Visits every path exactly once, in the order given, running the
/// single-image pipeline without logging to the scan history. After each item
/// a progress notification carries completed/total and the running counters.
/// A bad photo is recorded as UNKNOWN and the run carries on.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::inspector::Inspector;
use crate::state::record::{confidence_percent, file_name_of, Classification, InspectionRecord};

/// Lifecycle of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running,
    Completed,
}

/// Result of one photo within a batch
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub filename: String,
    pub path: PathBuf,
    pub result: Classification,
    pub confidence: f32,
    /// Severity string, e.g. "12px (Hairline)" or "N/A"
    pub width: String,
}

impl BatchItem {
    pub fn from_record(record: &InspectionRecord) -> Self {
        Self {
            filename: record.filename(),
            path: record.source_path.clone(),
            result: record.classification,
            confidence: record.confidence,
            width: record.severity_description(),
        }
    }
}

/// Emitted after every processed photo
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress<'a> {
    /// Photos processed so far, including `item`
    pub completed: usize,
    pub total: usize,
    pub crack_count: usize,
    pub safe_count: usize,
    pub unknown_count: usize,
    /// The photo that just finished
    pub item: &'a BatchItem,
}

impl BatchProgress<'_> {
    /// Whole percent done, truncated
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        (self.completed * 100 / self.total) as u32
    }
}

/// One row of a batch report table
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BatchReportRow {
    /// 1-based position in processing order
    pub id: usize,
    pub filename: String,
    pub result: Classification,
    pub confidence: f32,
    pub width: String,
}

/// Results and counters of one batch run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    items: Vec<BatchItem>,
    crack_count: usize,
    safe_count: usize,
    unknown_count: usize,
}

impl BatchSummary {
    /// Items in processing order
    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    /// Items most recent first, as a live list shows them
    pub fn display_order(&self) -> impl Iterator<Item = &BatchItem> {
        self.items.iter().rev()
    }

    pub fn processed(&self) -> usize {
        self.items.len()
    }

    pub fn crack_count(&self) -> usize {
        self.crack_count
    }

    pub fn safe_count(&self) -> usize {
        self.safe_count
    }

    pub fn unknown_count(&self) -> usize {
        self.unknown_count
    }

    /// e.g. "2 Cracks Detected / 5 Safe / 1 Unknown"
    pub fn summary_line(&self) -> String {
        format!(
            "{} Cracks Detected / {} Safe / {} Unknown",
            self.crack_count, self.safe_count, self.unknown_count
        )
    }

    /// Report table rows in processing order
    pub fn report_rows(&self) -> Vec<BatchReportRow> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, item)| BatchReportRow {
                id: i + 1,
                filename: item.filename.clone(),
                result: item.result,
                confidence: item.confidence,
                width: item.width.clone(),
            })
            .collect()
    }

    fn push(&mut self, item: BatchItem) {
        match item.result {
            Classification::Crack => self.crack_count += 1,
            Classification::Safe => self.safe_count += 1,
            Classification::Unknown => self.unknown_count += 1,
        }
        self.items.push(item);
    }
}

impl BatchReportRow {
    pub fn confidence_percent(&self) -> u32 {
        confidence_percent(self.confidence)
    }
}

/// Drives the single-image pipeline over an ordered list of photos
pub struct BatchOrchestrator<'a> {
    inspector: &'a Inspector,
    state: BatchState,
    summary: BatchSummary,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(inspector: &'a Inspector) -> Self {
        Self {
            inspector,
            state: BatchState::Idle,
            summary: BatchSummary::default(),
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn summary(&self) -> &BatchSummary {
        &self.summary
    }

    /// Process every path in order, blocking until the last one is done.
    ///
    /// A previous run's results are discarded. `on_progress` is called once
    /// per photo, after its result has been counted.
    pub fn run<P, F>(&mut self, paths: &[P], mut on_progress: F) -> &BatchSummary
    where
        P: AsRef<Path>,
        F: FnMut(&BatchProgress<'_>),
    {
        let total = paths.len();
        self.summary = BatchSummary::default();
        self.state = BatchState::Running;

        tracing::info!("🚁 Survey started: {} images", total);

        for path in paths {
            let path = path.as_ref();
            let record = self.inspector.inspect(path);
            self.summary.push(BatchItem::from_record(&record));

            let Some(item) = self.summary.items.last() else {
                continue;
            };
            let progress = BatchProgress {
                completed: self.summary.processed(),
                total,
                crack_count: self.summary.crack_count,
                safe_count: self.summary.safe_count,
                unknown_count: self.summary.unknown_count,
                item,
            };

            tracing::debug!(
                "[{}/{}] {} : {}",
                progress.completed,
                total,
                file_name_of(path),
                item.result
            );
            on_progress(&progress);
        }

        self.state = BatchState::Completed;
        tracing::info!("✅ Survey complete: {}", self.summary.summary_line());

        &self.summary
    }
}
