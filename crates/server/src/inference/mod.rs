//! Radiograph preprocessing and fracture classification

pub mod classifier;
pub mod onnx;
pub mod preprocess;

use std::path::PathBuf;

use spine_core::AnalysisError;
use thiserror::Error;

pub use classifier::{FractureClassifier, RawOutput, predict};
pub use onnx::OnnxClassifier;
pub use preprocess::{INPUT_SIZE, preprocess_image};

/// Failures between reading an upload and producing a prediction
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Unable to load image at path: {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Classifier failed: {0}")]
    Model(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}
