/// Single-image analysis pipeline
///
/// For one photo:
/// - preprocess + classify → confidence and CRACK/SAFE
/// - severity analysis and geotag lookup, independently
/// - fuse into an `InspectionRecord`
///
/// If preprocessing or prediction fails the whole record is UNKNOWN with zero
/// confidence. Severity and geotag failures only degrade their own fields.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{InspectError, Result};
use crate::model::classifier::{validate_score, ClassifierState};
use crate::model::load_classifier;
use crate::settings::{GeoTagMode, Settings};
use crate::state::history::{HistoryEntry, HistoryStore};
use crate::state::record::InspectionRecord;
use crate::vision::{analyze_severity, preprocess, read_geotag};

pub struct Inspector {
    classifier: ClassifierState,
    /// Single writer: every history mutation goes through this lock
    history: Mutex<HistoryStore>,
    crack_threshold: f32,
    geotag_mode: GeoTagMode,
}

impl Inspector {
    pub fn new(classifier: ClassifierState, history: HistoryStore, settings: &Settings) -> Self {
        Self {
            classifier,
            history: Mutex::new(history),
            crack_threshold: settings.crack_threshold,
            geotag_mode: settings.geotag_mode,
        }
    }

    /// Load the classifier and open the history named in `settings`
    pub fn from_settings(settings: &Settings) -> Self {
        let classifier = ClassifierState::from_load(load_classifier(&settings.model_path));
        let history = HistoryStore::open(&settings.history_path);
        Self::new(classifier, history, settings)
    }

    /// Classifier load state; front ends report an unavailable predictor once
    pub fn predictor_status(&self) -> &ClassifierState {
        &self.classifier
    }

    /// Analyse one photo without touching the history
    pub fn inspect(&self, path: &Path) -> InspectionRecord {
        let confidence = match self.classify(path) {
            Ok(confidence) => confidence,
            Err(InspectError::PredictorUnavailable(_)) => {
                return InspectionRecord::unknown(path);
            }
            Err(e) => {
                tracing::warn!("⚠️  Classification failed for {}: {}", path.display(), e);
                return InspectionRecord::unknown(path);
            }
        };

        let severity = match analyze_severity(path) {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                tracing::warn!("⚠️  Severity analysis failed for {}: {}", path.display(), e);
                None
            }
        };
        let geo_tag = read_geotag(path, self.geotag_mode);

        InspectionRecord::classified(path, confidence, self.crack_threshold, severity, geo_tag)
    }

    /// Analyse one photo and log it to the scan history
    pub fn analyze(&self, path: &Path) -> InspectionRecord {
        let record = self.inspect(path);

        if let Some(entry) = HistoryEntry::from_record(&record) {
            if let Err(e) = self.history().record(entry) {
                tracing::warn!("⚠️  Could not save scan history: {}", e);
            }
        }

        record
    }

    /// Reload the history from disk and return it, newest first
    pub fn history_entries(&self) -> Vec<HistoryEntry> {
        let mut history = self.history();
        history.reload();
        history.entries().to_vec()
    }

    fn history(&self) -> MutexGuard<'_, HistoryStore> {
        self.history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn classify(&self, path: &Path) -> Result<f32> {
        let classifier = self.classifier.classifier().ok_or_else(|| {
            InspectError::PredictorUnavailable(
                self.classifier
                    .unavailable_reason()
                    .unwrap_or_default()
                    .to_string(),
            )
        })?;

        let tensor = preprocess(path)?;
        let score = classifier.predict(&tensor)?;
        validate_score(score)
    }
}

impl std::fmt::Debug for Inspector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inspector")
            .field("classifier", &self.classifier)
            .field("crack_threshold", &self.crack_threshold)
            .field("geotag_mode", &self.geotag_mode)
            .finish_non_exhaustive()
    }
}
