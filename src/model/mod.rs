/// Defect classifier module
///
/// The classifier is an opaque scoring function: a preprocessed tensor goes
/// in, the probability of a crack comes out. Backends live behind the
/// `DefectClassifier` trait so they can be swapped.
///
/// Architecture:
/// - `classifier.rs` - capability trait, loader and load state
/// - `onnx.rs` - ONNX Runtime backend (cargo feature `onnx`)

pub mod classifier;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use classifier::{
    load_classifier, load_classifier_async, ClassifierState, DefectClassifier, SharedClassifier,
};
