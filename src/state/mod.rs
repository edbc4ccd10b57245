/// State management module
///
/// This module handles the data that outlives a single analysis step:
/// - Inspection results and their report fields (record.rs)
/// - The persisted scan log (history.rs)

pub mod record;
pub mod history;

pub use history::{HistoryEntry, HistoryStore};
pub use record::{Classification, InspectionRecord, ReportFields};
