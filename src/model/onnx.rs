/// ONNX Runtime classifier backend
///
/// Compiled only with the `onnx` cargo feature.

use ort::logging::LogLevel;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use std::sync::Mutex;

use super::classifier::{validate_score, DefectClassifier};
use crate::error::{InspectError, Result};
use crate::vision::InputTensor;

/// Binary crack classifier exported to ONNX
///
/// Expects a single NHWC float input `[1, 224, 224, 3]` and reads the first
/// value of the first output as the crack probability.
pub struct OnnxClassifier {
    session: Mutex<Session>,
}

impl OnnxClassifier {
    pub fn load(path: &Path) -> Result<Self> {
        let session = Session::builder()
            .and_then(|builder| builder.with_log_level(LogLevel::Error))
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| {
                InspectError::PredictorUnavailable(format!(
                    "failed to create ONNX session from {}: {}",
                    path.display(),
                    e
                ))
            })?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl DefectClassifier for OnnxClassifier {
    fn predict(&self, tensor: &InputTensor) -> Result<f32> {
        let dims: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let data = tensor.as_slice().ok_or_else(|| {
            InspectError::Inference("input tensor is not contiguous in memory".to_string())
        })?;
        let input = TensorRef::from_array_view((dims, data))
            .map_err(|e| InspectError::Inference(format!("failed to build input tensor: {}", e)))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| InspectError::Inference("session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| InspectError::Inference(format!("forward pass failed: {}", e)))?;

        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| InspectError::Inference(format!("unexpected output tensor: {}", e)))?;

        let score = scores
            .first()
            .copied()
            .ok_or_else(|| InspectError::Inference("model returned an empty output".to_string()))?;

        validate_score(score.clamp(0.0, 1.0))
    }

    fn name(&self) -> &str {
        "onnx"
    }
}
