use core::fmt;

use ahash::HashSet;
use prose_features::FeatureVector;
use tracing::debug;

use crate::{
    error::DetectError,
    model::{Label, LabelConvention, Model},
};

/// Value given to schema features the extractor did not produce.
pub const DEFAULT_FEATURE_VALUE: f64 = 0.0;

/// Verdict for one text, decided by comparing the model's label with the
/// [`LabelConvention`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Classification {
    Human,
    AI,
}

impl Classification {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Human => "Human",
            Self::AI => "AI",
        }
    }

    #[must_use]
    pub fn is_human(self) -> bool {
        self == Self::Human
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single record laid out exactly as a model expects it.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FeatureRow {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureRow {
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| self.values[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of running one feature vector through a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub classification: Classification,
    /// Label exactly as the model returned it.
    pub label: Label,
    /// The row passed to the model.
    pub model_input: FeatureRow,
}

/// Schema names absent from `vector`, in schema order.
pub fn missing_features<'a>(vector: &FeatureVector, schema: &'a [String]) -> Vec<&'a str> {
    schema
        .iter()
        .map(String::as_str)
        .filter(|name| !vector.contains(name))
        .collect()
}

/// Copy of `vector` with every missing schema name set to [`DEFAULT_FEATURE_VALUE`].
#[must_use]
pub fn fill_missing(vector: &FeatureVector, schema: &[String]) -> FeatureVector {
    let missing = missing_features(vector, schema);
    if !missing.is_empty() {
        debug!(?missing, "Filling features absent from the extracted vector");
    }
    let mut filled = vector.clone();
    for name in missing {
        filled.insert(name, DEFAULT_FEATURE_VALUE);
    }
    filled
}

/// Select and order the schema's features out of `vector`.
///
/// Features not in the schema are dropped. Every schema name must be present
/// and finite, and appear in the schema only once.
pub fn project(vector: &FeatureVector, schema: &[String]) -> Result<FeatureRow, DetectError> {
    let mut seen = HashSet::default();
    let mut values = Vec::with_capacity(schema.len());

    for name in schema {
        if !seen.insert(name.as_str()) {
            return Err(DetectError::DuplicateFeature(name.clone()));
        }
        let value = vector
            .get(name)
            .ok_or_else(|| DetectError::MissingFeature(name.clone()))?;
        if !value.is_finite() {
            return Err(DetectError::NonFiniteFeature {
                name: name.clone(),
                value,
            });
        }
        values.push(value);
    }

    let dropped = vector.len().saturating_sub(values.len());
    debug!(
        num_features = values.len(),
        dropped, "Projected feature vector onto model schema"
    );

    Ok(FeatureRow {
        names: schema.to_vec(),
        values,
    })
}

/// Fill missing features with defaults, then project onto the schema.
pub fn reconcile(vector: &FeatureVector, schema: &[String]) -> Result<FeatureRow, DetectError> {
    project(&fill_missing(vector, schema), schema)
}

/// Run exactly one prediction for a single row.
pub fn predict_label<M: Model + ?Sized>(model: &M, row: &FeatureRow) -> Result<Label, DetectError> {
    let labels = model.predict(row)?;
    match labels.as_slice() {
        [label] => Ok(*label),
        _ => Err(DetectError::UnexpectedPredictionCount(labels.len())),
    }
}

/// Reconcile `vector` against the model's schema and classify it.
pub fn classify<M: Model + ?Sized>(
    vector: &FeatureVector,
    model: &M,
    labels: LabelConvention,
) -> Result<Inference, DetectError> {
    let row = reconcile(vector, model.feature_names())?;
    let label = predict_label(model, &row)?;
    let classification = labels.classify(label);
    debug!(label, %classification, "Model prediction");
    Ok(Inference {
        classification,
        label,
        model_input: row,
    })
}
