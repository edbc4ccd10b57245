//! Concrete crack inspection.
//!
//! A photo is scored by an opaque crack classifier, measured independently
//! by an edge/contour severity pipeline, geotagged from its EXIF data, and
//! fused into an [`InspectionRecord`]. Single inspections are logged to a
//! persisted scan history; batch surveys run the same pipeline over a folder
//! with running counters and per-item progress.

pub mod error;
pub mod model;
pub mod pipeline;
pub mod settings;
pub mod state;
pub mod vision;

pub use error::{InspectError, Result};
pub use model::{load_classifier, load_classifier_async, ClassifierState, DefectClassifier};
pub use pipeline::{BatchOrchestrator, BatchProgress, BatchState, BatchSummary, Inspector};
pub use settings::{GeoTagMode, Settings};
pub use state::{Classification, HistoryEntry, HistoryStore, InspectionRecord, ReportFields};
pub use vision::{SeverityAnalysis, SeverityLabel};
