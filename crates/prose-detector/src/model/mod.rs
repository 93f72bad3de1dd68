//! The capability a classifier backend has to provide, plus the built-in
//! backends.

mod logistic;
#[cfg(feature = "onnx")]
mod onnx;

use std::path::Path;

pub use logistic::{LogisticModel, StandardScaler};
#[cfg(feature = "onnx")]
pub use onnx::{OnnxManifest, OnnxModel};

use crate::{
    error::ArtifactError,
    pipeline::{Classification, FeatureRow},
};

/// Class label as produced by a trained model.
pub type Label = i64;

/// Label that the original artifact uses for human-written text.
pub const DEFAULT_HUMAN_LABEL: Label = 1;

/// A trained binary classifier over named numeric features.
///
/// Implementations are loaded once and shared read-only between requests.
pub trait Model: Send + Sync {
    /// Features the model was trained on, in the order it expects them.
    fn feature_names(&self) -> &[String];

    /// Predict labels for `row`, whose names match [`Model::feature_names`].
    fn predict(&self, row: &FeatureRow) -> Result<Vec<Label>, PredictError>;

    /// Label convention stored with the artifact, if any.
    fn label_convention(&self) -> Option<LabelConvention> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictError {
    #[error("expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("feature {position} is `{actual}` but the model expects `{expected}`")]
    FeatureOrder {
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("{0}")]
    Backend(String),
}

/// Check that `row` is laid out exactly as `schema`.
pub fn check_row(schema: &[String], row: &FeatureRow) -> Result<(), PredictError> {
    if row.len() != schema.len() {
        return Err(PredictError::ShapeMismatch {
            expected: schema.len(),
            actual: row.len(),
        });
    }
    match schema
        .iter()
        .zip(row.names())
        .position(|(expected, actual)| expected != actual)
    {
        Some(position) => Err(PredictError::FeatureOrder {
            position,
            expected: schema[position].clone(),
            actual: row.names()[position].clone(),
        }),
        None => Ok(()),
    }
}

/// Which model label means "human-written".
///
/// This is a property of the trained artifact: a model trained with the
/// classes the other way round flips it. Every other label is read as AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LabelConvention {
    pub human_label: Label,
}

impl LabelConvention {
    #[must_use]
    pub fn new(human_label: Label) -> Self {
        Self { human_label }
    }

    #[inline]
    #[must_use]
    pub fn classify(&self, label: Label) -> Classification {
        if label == self.human_label {
            Classification::Human
        } else {
            Classification::AI
        }
    }
}

impl Default for LabelConvention {
    fn default() -> Self {
        Self::new(DEFAULT_HUMAN_LABEL)
    }
}

pub(crate) fn read_artifact(path: &Path) -> Result<String, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use prose_features::FeatureVector;

    use super::*;
    use crate::pipeline::reconcile;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_convention_is_one_for_human() {
        let labels = LabelConvention::default();
        assert_eq!(labels.classify(1), Classification::Human);
        assert_eq!(labels.classify(0), Classification::AI);
        assert_eq!(labels.classify(-1), Classification::AI);
    }

    #[test]
    fn test_flipped_convention() {
        let labels = LabelConvention::new(0);
        assert_eq!(labels.classify(0), Classification::Human);
        assert_eq!(labels.classify(1), Classification::AI);
    }

    #[test]
    fn test_check_row_accepts_matching_layout() {
        let schema = names(&["a", "b"]);
        let row = reconcile(&FeatureVector::new(), &schema).unwrap();
        assert_eq!(check_row(&schema, &row), Ok(()));
    }

    #[test]
    fn test_check_row_rejects_wrong_shape() {
        let row = reconcile(&FeatureVector::new(), &names(&["a"])).unwrap();
        assert_eq!(
            check_row(&names(&["a", "b"]), &row),
            Err(PredictError::ShapeMismatch {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_check_row_rejects_wrong_order() {
        let row = reconcile(&FeatureVector::new(), &names(&["b", "a"])).unwrap();
        let err = check_row(&names(&["a", "b"]), &row).unwrap_err();
        assert_eq!(
            err,
            PredictError::FeatureOrder {
                position: 0,
                expected: "a".to_string(),
                actual: "b".to_string()
            }
        );
    }

    #[test]
    fn test_read_artifact_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(matches!(read_artifact(&path), Err(ArtifactError::NotFound(p)) if p == path));
    }
}
