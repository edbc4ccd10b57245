/// Inspection results
///
/// These structs represent the data model that flows between the analysis
/// pipeline and whatever presents or reports on it.

use chrono::{DateTime, Local};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{InspectError, Result};
use crate::vision::geotag::GEO_NOT_AVAILABLE;
use crate::vision::severity::{SeverityAnalysis, SeverityLabel, SEVERITY_NOT_AVAILABLE};

/// Default decision threshold on the crack probability
pub const DEFAULT_CRACK_THRESHOLD: f32 = 0.5;

/// Outcome of the classifier for one photo
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Crack,
    Safe,
    /// Preprocessing or prediction failed
    Unknown,
}

impl Classification {
    /// CRACK iff the confidence is strictly above the threshold
    pub fn from_confidence(confidence: f32, threshold: f32) -> Self {
        if confidence > threshold {
            Classification::Crack
        } else {
            Classification::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Crack => "CRACK",
            Classification::Safe => "SAFE",
            Classification::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fused result of analysing one photo. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionRecord {
    /// The photo that was analysed
    pub source_path: PathBuf,
    pub classification: Classification,
    /// Raw classifier score, probability of CRACK
    pub confidence: f32,
    /// None when unknown or when no feature was measured
    pub severity_label: Option<SeverityLabel>,
    pub max_feature_width_px: u32,
    /// Coordinates or the not-available sentinel
    pub geo_tag: String,
    /// Edge heatmap blended over the source, same size as the source
    pub overlay_image: Option<RgbImage>,
    /// When the analysis finished
    pub timestamp: DateTime<Local>,
}

impl InspectionRecord {
    /// Record for a photo that could not be classified
    pub fn unknown(source_path: &Path) -> Self {
        Self {
            source_path: source_path.to_path_buf(),
            classification: Classification::Unknown,
            confidence: 0.0,
            severity_label: None,
            max_feature_width_px: 0,
            geo_tag: GEO_NOT_AVAILABLE.to_string(),
            overlay_image: None,
            timestamp: Local::now(),
        }
    }

    /// Assemble a classified record from the independent sub-results
    pub fn classified(
        source_path: &Path,
        confidence: f32,
        threshold: f32,
        severity: Option<SeverityAnalysis>,
        geo_tag: String,
    ) -> Self {
        let (severity_label, max_feature_width_px, overlay_image) = match severity {
            Some(analysis) => (
                analysis.label,
                analysis.max_feature_width_px,
                Some(analysis.overlay),
            ),
            None => (None, 0, None),
        };

        Self {
            source_path: source_path.to_path_buf(),
            classification: Classification::from_confidence(confidence, threshold),
            confidence,
            severity_label,
            max_feature_width_px,
            geo_tag,
            overlay_image,
            timestamp: Local::now(),
        }
    }

    /// File name only (e.g., "IMG_0042.jpg")
    pub fn filename(&self) -> String {
        file_name_of(&self.source_path)
    }

    pub fn is_unknown(&self) -> bool {
        self.classification == Classification::Unknown
    }

    /// e.g. `"42px (Moderate)"`, or `"N/A"`
    pub fn severity_description(&self) -> String {
        match self.severity_label {
            Some(label) => format!("{}px ({})", self.max_feature_width_px, label),
            None => SEVERITY_NOT_AVAILABLE.to_string(),
        }
    }

    /// Write the overlay as an image file; `Ok(false)` when there is none
    pub fn save_overlay(&self, path: &Path) -> Result<bool> {
        let Some(overlay) = &self.overlay_image else {
            return Ok(false);
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| InspectError::io(parent, e))?;
            }
        }
        overlay
            .save(path)
            .map_err(|e| InspectError::Encode {
                path: path.to_path_buf(),
                source: e,
            })?;

        tracing::info!("📸 Saved overlay: {}", path.display());
        Ok(true)
    }

    /// Named fields consumed by report generators
    pub fn report_fields(&self) -> ReportFields {
        ReportFields {
            filename: self.filename(),
            result: self.classification,
            confidence: self.confidence,
            width: self.severity_description(),
            gps: self.geo_tag.clone(),
        }
    }
}

/// What a report needs to know about one inspection
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ReportFields {
    pub filename: String,
    pub result: Classification,
    pub confidence: f32,
    /// Severity string
    pub width: String,
    pub gps: String,
}

impl ReportFields {
    /// Whole percent, truncated
    pub fn confidence_percent(&self) -> u32 {
        confidence_percent(self.confidence)
    }
}

/// Truncated whole percent of a probability
pub fn confidence_percent(confidence: f32) -> u32 {
    (confidence.clamp(0.0, 1.0) * 100.0).floor() as u32
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}
