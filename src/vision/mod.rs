/// Image analysis module
///
/// This module handles:
/// - Normalizing photos into classifier input tensors (preprocess.rs)
/// - Edge/contour severity estimation and overlays (severity.rs)
/// - The jet colour ramp used for overlays (colormap.rs)
/// - Reading EXIF geotags (geotag.rs)

pub mod preprocess;
pub mod severity;
pub mod colormap;
pub mod geotag;

pub use preprocess::{preprocess, preprocess_image, InputTensor, INPUT_SIZE};
pub use severity::{analyze_severity, analyze_severity_image, SeverityAnalysis, SeverityLabel};
pub use geotag::{read_geotag, GEO_NOT_AVAILABLE};
