/// Inspection pipeline module
///
/// Architecture:
/// - `inspector.rs` - single-image analysis (classifier + severity + geotag)
/// - `batch.rs` - ordered batch runs with running counters and progress
/// - `survey.rs` - listing the photos of a survey folder

pub mod inspector;
pub mod batch;
pub mod survey;

pub use batch::{BatchItem, BatchOrchestrator, BatchProgress, BatchReportRow, BatchState, BatchSummary};
pub use inspector::Inspector;
pub use survey::{is_survey_image, list_survey_images, IMAGE_EXTENSIONS};
