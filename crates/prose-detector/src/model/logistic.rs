use std::path::Path;

use ahash::HashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Label, LabelConvention, Model, PredictError, check_row, read_artifact};
use crate::{error::ArtifactError, pipeline::FeatureRow};

fn default_classes() -> [Label; 2] {
    [0, 1]
}

/// Per-feature standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    fn transform(&self, idx: usize, value: f64) -> f64 {
        (value - self.mean[idx]) / self.scale[idx]
    }
}

/// Binary logistic regression over named features, optionally preceded by a
/// standard scaler, stored as a JSON artifact.
///
/// ```json
/// {
///   "feature_names_in": ["word_count", "burstiness"],
///   "scaler": { "mean": [120.0, 0.4], "scale": [60.0, 0.2] },
///   "coef": [0.8, 1.3],
///   "intercept": -0.2,
///   "classes": [0, 1],
///   "human_label": 1
/// }
/// ```
///
/// `classes[1]` is predicted when the decision function is positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    feature_names_in: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scaler: Option<StandardScaler>,
    coef: Vec<f64>,
    intercept: f64,
    #[serde(default = "default_classes")]
    classes: [Label; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    human_label: Option<Label>,
}

impl LogisticModel {
    pub fn new(
        feature_names_in: Vec<String>,
        coef: Vec<f64>,
        intercept: f64,
    ) -> Result<Self, ArtifactError> {
        Self {
            feature_names_in,
            scaler: None,
            coef,
            intercept,
            classes: default_classes(),
            human_label: None,
        }
        .validated()
    }

    pub fn with_scaler(mut self, scaler: StandardScaler) -> Result<Self, ArtifactError> {
        self.scaler = Some(scaler);
        self.validated()
    }

    #[must_use]
    pub fn with_classes(mut self, classes: [Label; 2]) -> Self {
        self.classes = classes;
        self
    }

    #[must_use]
    pub fn with_human_label(mut self, human_label: Label) -> Self {
        self.human_label = Some(human_label);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        serde_json::from_str::<Self>(json)?.validated()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let model = Self::from_json(&read_artifact(path)?)?;
        info!(
            path = %path.display(),
            num_features = model.feature_names_in.len(),
            "Loaded logistic model"
        );
        Ok(model)
    }

    fn validated(self) -> Result<Self, ArtifactError> {
        let n = self.feature_names_in.len();
        if n == 0 {
            return Err(ArtifactError::Invalid("no features declared".into()));
        }
        if self.coef.len() != n {
            return Err(ArtifactError::Invalid(format!(
                "{} coefficients for {n} features",
                self.coef.len()
            )));
        }
        let mut seen = HashSet::default();
        if let Some(dup) = self.feature_names_in.iter().find(|name| !seen.insert(*name)) {
            return Err(ArtifactError::Invalid(format!("duplicate feature `{dup}`")));
        }
        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err(ArtifactError::Invalid(format!(
                    "scaler has {} means and {} scales for {n} features",
                    scaler.mean.len(),
                    scaler.scale.len()
                )));
            }
            if scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(ArtifactError::Invalid(
                    "scaler scales must be finite and non-zero".into(),
                ));
            }
        }
        let parameters_finite = self.intercept.is_finite()
            && self.coef.iter().all(|c| c.is_finite())
            && self
                .scaler
                .as_ref()
                .map_or(true, |s| s.mean.iter().all(|m| m.is_finite()));
        if !parameters_finite {
            return Err(ArtifactError::Invalid("non-finite model parameter".into()));
        }
        Ok(self)
    }

    /// Signed distance from the decision boundary.
    #[must_use]
    pub fn decision_function(&self, values: &[f64]) -> f64 {
        self.coef
            .iter()
            .zip(values)
            .enumerate()
            .map(|(idx, (coef, &value))| {
                let x = self
                    .scaler
                    .as_ref()
                    .map_or(value, |scaler| scaler.transform(idx, value));
                coef * x
            })
            .sum::<f64>()
            + self.intercept
    }

    /// Probability of `classes[1]`.
    #[must_use]
    pub fn probability(&self, values: &[f64]) -> f64 {
        1.0 / (1.0 + (-self.decision_function(values)).exp())
    }

    #[must_use]
    pub fn classes(&self) -> [Label; 2] {
        self.classes
    }
}

impl Model for LogisticModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names_in
    }

    fn predict(&self, row: &FeatureRow) -> Result<Vec<Label>, PredictError> {
        check_row(&self.feature_names_in, row)?;
        let score = self.decision_function(row.values());
        if !score.is_finite() {
            return Err(PredictError::Backend(format!(
                "decision function is not finite ({score})"
            )));
        }
        let label = if score > 0.0 {
            self.classes[1]
        } else {
            self.classes[0]
        };
        debug!(score, label, "Logistic decision");
        Ok(vec![label])
    }

    fn label_convention(&self) -> Option<LabelConvention> {
        self.human_label.map(LabelConvention::new)
    }
}
