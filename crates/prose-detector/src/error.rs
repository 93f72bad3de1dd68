use std::path::PathBuf;

use crate::model::PredictError;

/// Failure to shape a feature vector for the model or to run the prediction.
///
/// Numeric edge cases during extraction never end up here; they are absorbed
/// by the extractor.
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    #[error("model schema lists feature `{0}` more than once")]
    DuplicateFeature(String),

    #[error("feature `{0}` is missing from the reconciled vector")]
    MissingFeature(String),

    #[error("feature `{name}` has a non-finite value ({value})")]
    NonFiniteFeature { name: String, value: f64 },

    #[error("prediction failed: {0}")]
    Predict(#[from] PredictError),

    #[error("model returned {0} labels for a single row")]
    UnexpectedPredictionCount(usize),
}

/// Failure to load a model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("model artifact not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read model artifact {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed model artifact")]
    Parse(#[from] serde_json::Error),

    #[error("invalid model artifact: {0}")]
    Invalid(String),

    #[error("onnx runtime: {0}")]
    Onnx(String),
}
