/// Classifier capability and load state
///
/// The classifier is loaded once at startup and shared afterwards as an
/// immutable handle. A failed load is not fatal: the pipeline keeps running
/// in "predictor unavailable" mode and every analysis reports UNKNOWN.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task;

use crate::error::{InspectError, Result};
use crate::vision::InputTensor;

/// Opaque crack scorer: tensor in, probability of CRACK out
pub trait DefectClassifier: Send + Sync {
    /// Score one preprocessed photo. Implementations return a value in [0, 1].
    fn predict(&self, tensor: &InputTensor) -> Result<f32>;

    /// Short backend name for logs
    fn name(&self) -> &str {
        "classifier"
    }
}

/// Plain functions and closures can act as classifiers (handy for stubs)
impl<F> DefectClassifier for F
where
    F: Fn(&InputTensor) -> Result<f32> + Send + Sync,
{
    fn predict(&self, tensor: &InputTensor) -> Result<f32> {
        self(tensor)
    }
}

/// Shareable classifier handle
pub type SharedClassifier = Arc<dyn DefectClassifier>;

/// Reject scores a probability can't have
pub fn validate_score(score: f32) -> Result<f32> {
    if score.is_finite() && (0.0..=1.0).contains(&score) {
        Ok(score)
    } else {
        Err(InspectError::Inference(format!(
            "score {} is outside [0, 1]",
            score
        )))
    }
}

/// Load the classifier artifact from disk
pub fn load_classifier(path: &Path) -> Result<SharedClassifier> {
    tracing::info!("🔍 Looking for model at: {}", path.display());

    if !path.exists() {
        return Err(InspectError::PredictorUnavailable(format!(
            "Model file not found at: {}",
            path.display()
        )));
    }

    load_backend(path)
}

#[cfg(feature = "onnx")]
fn load_backend(path: &Path) -> Result<SharedClassifier> {
    let classifier = super::onnx::OnnxClassifier::load(path)?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "onnx"))]
fn load_backend(path: &Path) -> Result<SharedClassifier> {
    Err(InspectError::PredictorUnavailable(format!(
        "no inference backend compiled in (rebuild with --features onnx) for {}",
        path.display()
    )))
}

/// Load the classifier on a blocking thread so callers can keep working
pub async fn load_classifier_async(path: PathBuf) -> Result<SharedClassifier> {
    // Spawn blocking because model loading is CPU and I/O heavy
    task::spawn_blocking(move || load_classifier(&path))
        .await
        .map_err(|e| InspectError::PredictorUnavailable(format!("Task join error: {}", e)))?
}

/// Whether the pipeline has a usable classifier
#[derive(Clone)]
pub enum ClassifierState {
    Ready(SharedClassifier),
    Unavailable(String),
}

impl ClassifierState {
    /// Convert a load result, logging the outcome once
    pub fn from_load(result: Result<SharedClassifier>) -> Self {
        match result {
            Ok(classifier) => {
                tracing::info!("✅ Model loaded successfully ({})", classifier.name());
                ClassifierState::Ready(classifier)
            }
            Err(e) => {
                tracing::error!("❌ Could not load model: {}", e);
                ClassifierState::Unavailable(e.to_string())
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ClassifierState::Ready(_))
    }

    pub fn classifier(&self) -> Option<&SharedClassifier> {
        match self {
            ClassifierState::Ready(classifier) => Some(classifier),
            ClassifierState::Unavailable(_) => None,
        }
    }

    /// Why the predictor is unavailable, if it is
    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            ClassifierState::Ready(_) => None,
            ClassifierState::Unavailable(reason) => Some(reason),
        }
    }
}

impl std::fmt::Debug for ClassifierState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierState::Ready(classifier) => {
                f.debug_tuple("Ready").field(&classifier.name()).finish()
            }
            ClassifierState::Unavailable(reason) => {
                f.debug_tuple("Unavailable").field(reason).finish()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_validation() {
        assert_eq!(validate_score(0.0).unwrap(), 0.0);
        assert_eq!(validate_score(1.0).unwrap(), 1.0);
        assert!(validate_score(1.5).is_err());
        assert!(validate_score(-0.1).is_err());
        assert!(validate_score(f32::NAN).is_err());
    }

    #[test]
    fn test_closure_acts_as_classifier() {
        let stub = |_: &InputTensor| -> Result<f32> { Ok(0.9) };
        let shared: SharedClassifier = Arc::new(stub);
        let tensor = InputTensor::zeros((1, 224, 224, 3));
        assert_eq!(shared.predict(&tensor).unwrap(), 0.9);
    }

    #[test]
    fn test_missing_model_is_unavailable() {
        let result = load_classifier(Path::new("/nonexistent/crack_detection_model.onnx"));
        assert!(matches!(result, Err(InspectError::PredictorUnavailable(_))));

        let state = ClassifierState::from_load(result);
        assert!(!state.is_ready());
        assert!(state.classifier().is_none());
        assert!(state.unavailable_reason().unwrap().contains("Model file not found"));
    }

    #[tokio::test]
    async fn test_async_load_missing_model() {
        let result = load_classifier_async(PathBuf::from("/nonexistent/model.onnx")).await;
        assert!(matches!(result, Err(InspectError::PredictorUnavailable(_))));
    }
}
