//! ONNX Runtime backend for classifiers exported from a training pipeline.
//!
//! An exported graph carries no feature names, so the model is described by a
//! JSON manifest next to it:
//!
//! ```json
//! {
//!   "model": "classifier.onnx",
//!   "feature_names_in": ["word_count", "character_count"],
//!   "human_label": 1
//! }
//! ```
//!
//! The graph takes one `float32` input of shape `[rows, features]`; its first
//! output holds the `int64` labels. With the `load-dynamic` runtime,
//! `ORT_DYLIB_PATH` must point to `libonnxruntime`.

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::Tensor,
};
use serde::Deserialize;
use tracing::{debug, info};

use super::{Label, LabelConvention, Model, PredictError, check_row, read_artifact};
use crate::{error::ArtifactError, pipeline::FeatureRow};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OnnxManifest {
    /// Path of the `.onnx` file, relative to the manifest.
    pub model: PathBuf,
    pub feature_names_in: Vec<String>,
    #[serde(default)]
    pub human_label: Option<Label>,
}

impl OnnxManifest {
    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let manifest = serde_json::from_str::<Self>(json)?;
        if manifest.feature_names_in.is_empty() {
            return Err(ArtifactError::Invalid("no features declared".into()));
        }
        Ok(manifest)
    }
}

pub struct OnnxModel {
    session: Mutex<Session>,
    feature_names: Vec<String>,
    human_label: Option<Label>,
}

impl OnnxModel {
    /// Load the manifest at `path` and the graph it points to.
    pub fn from_manifest(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let manifest = OnnxManifest::from_json(&read_artifact(path)?)?;
        let model_path = path
            .parent()
            .map_or_else(|| manifest.model.clone(), |dir| dir.join(&manifest.model));

        let mut model = Self::from_file(&model_path, manifest.feature_names_in)?;
        model.human_label = manifest.human_label;
        Ok(model)
    }

    pub fn from_file(
        model_path: impl AsRef<Path>,
        feature_names: Vec<String>,
    ) -> Result<Self, ArtifactError> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(ArtifactError::NotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| ArtifactError::Onnx(format!("failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ArtifactError::Onnx(format!("failed to set optimization level: {e}")))?
            .with_intra_threads(1)
            .map_err(|e| ArtifactError::Onnx(format!("failed to set intra threads: {e}")))?
            .commit_from_file(model_path)
            .map_err(|e| ArtifactError::Onnx(format!("failed to load model: {e}")))?;

        info!(
            path = %model_path.display(),
            num_features = feature_names.len(),
            "Loaded ONNX model"
        );

        Ok(Self {
            session: Mutex::new(session),
            feature_names,
            human_label: None,
        })
    }
}

impl Model for OnnxModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, row: &FeatureRow) -> Result<Vec<Label>, PredictError> {
        check_row(&self.feature_names, row)?;

        // exported graphs take float32
        let data = row.values().iter().map(|&v| v as f32).collect::<Vec<_>>();
        let input = Tensor::from_array(([1usize, data.len()], data))
            .map_err(|e| PredictError::Backend(format!("failed to build input tensor: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| PredictError::Backend("session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| PredictError::Backend(format!("inference failed: {e}")))?;

        // First output: class labels (e.g. [1])
        let (_, labels) = outputs[0]
            .try_extract_tensor::<i64>()
            .map_err(|e| PredictError::Backend(format!("unexpected label output: {e}")))?;
        debug!(?labels, "ONNX prediction");
        Ok(labels.to_vec())
    }

    fn label_convention(&self) -> Option<LabelConvention> {
        self.human_label.map(LabelConvention::new)
    }
}
