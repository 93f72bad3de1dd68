//! # prose-detector
//!
//! Classify a passage as human-written or AI-generated from a small set of
//! linguistic statistics.
//!
//! The text is turned into a [`FeatureVector`] by [`prose_features::extract`],
//! reconciled against the feature list the trained [`Model`] declares (absent
//! features default to `0.0`, extras are dropped, order follows the model) and
//! passed to the model as a single row.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use prose_detector::{Detector, LogisticModel};
//!
//! let model = LogisticModel::new(vec!["burstiness".to_string()], vec![4.0], -0.5)?;
//! let detector = Detector::new(Arc::new(model));
//!
//! let verdict = detector.classify("Short one. Then a much longer sentence follows it here!")?;
//! println!("{} ({} features sent)", verdict.classification, verdict.model_input.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Label convention
//!
//! Which model label means "human" belongs to the trained artifact. It is read
//! from the artifact when present and defaults to `1`:
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use prose_detector::{Detector, LabelConvention, LogisticModel};
//!
//! let model = LogisticModel::new(vec!["word_count".to_string()], vec![1.0], 0.0)?;
//! let detector = Detector::new(Arc::new(model)).with_label_convention(LabelConvention::new(0));
//! assert_eq!(detector.label_convention().human_label, 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#[cfg(feature = "cli")]
pub mod cli;

mod error;
pub mod model;
pub mod pipeline;

use std::sync::Arc;

use tracing::warn;

pub use error::{ArtifactError, DetectError};
#[cfg(feature = "onnx")]
pub use model::OnnxModel;
pub use model::{Label, LabelConvention, LogisticModel, Model, PredictError};
pub use pipeline::{Classification, FeatureRow, Inference};
pub use prose_features::{FeatureVector, extract};

/// Outcome of a successful classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub classification: Classification,
    /// Label exactly as the model returned it.
    pub label: Label,
    /// Every extracted feature, including those the model does not use.
    pub features: FeatureVector,
    /// The reconciled row the model saw.
    pub model_input: FeatureRow,
}

/// Flattened outcome of [`Detector::classify_text`].
///
/// Either `classification` or `error` is set, never both. `features` is
/// always present so callers can show what was measured.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Detection {
    pub classification: Option<Classification>,
    pub label: Option<Label>,
    pub features: FeatureVector,
    pub model_input: Option<FeatureRow>,
    pub error: Option<String>,
}

impl Detection {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl From<Verdict> for Detection {
    fn from(verdict: Verdict) -> Self {
        Self {
            classification: Some(verdict.classification),
            label: Some(verdict.label),
            features: verdict.features,
            model_input: Some(verdict.model_input),
            error: None,
        }
    }
}

/// Runs text through feature extraction and a shared, read-only model.
///
/// Holds no per-request state: every call extracts a fresh feature vector.
#[derive(Clone)]
pub struct Detector {
    model: Arc<dyn Model>,
    labels: LabelConvention,
}

impl Detector {
    /// Create a detector using the model's own label convention, or
    /// [`LabelConvention::default`] if the model does not declare one.
    #[must_use]
    pub fn new(model: Arc<dyn Model>) -> Self {
        let labels = model.label_convention().unwrap_or_default();
        Self { model, labels }
    }

    /// Override the label convention.
    #[must_use]
    pub fn with_label_convention(mut self, labels: LabelConvention) -> Self {
        self.labels = labels;
        self
    }

    #[must_use]
    pub fn label_convention(&self) -> LabelConvention {
        self.labels
    }

    #[must_use]
    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    /// Classify an already extracted feature vector.
    pub fn classify_features(&self, features: &FeatureVector) -> Result<Inference, DetectError> {
        pipeline::classify(features, self.model.as_ref(), self.labels)
    }

    /// Extract features from `text` and classify them.
    pub fn classify(&self, text: &str) -> Result<Verdict, DetectError> {
        let features = extract(text);
        let inference = self.classify_features(&features)?;
        Ok(Verdict {
            classification: inference.classification,
            label: inference.label,
            features,
            model_input: inference.model_input,
        })
    }

    /// Like [`Detector::classify`], but reports failures in the result instead
    /// of returning them, keeping the extracted features either way.
    #[must_use]
    pub fn classify_text(&self, text: &str) -> Detection {
        let features = extract(text);
        match self.classify_features(&features) {
            Ok(inference) => Detection {
                classification: Some(inference.classification),
                label: Some(inference.label),
                features,
                model_input: Some(inference.model_input),
                error: None,
            },
            Err(err) => {
                warn!(error = %err, "Classification failed");
                Detection {
                    classification: None,
                    label: None,
                    features,
                    model_input: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("feature_names", &self.model.feature_names())
            .field("labels", &self.labels)
            .finish()
    }
}
