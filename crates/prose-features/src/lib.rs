//! Linguistic features for telling human-written text from AI-generated text.
//!
//! [`extract`] turns a passage into a [`FeatureVector`] of 13 named values:
//! counts, ratios, sentence-length burstiness and a Flesch readability score.
//! Extraction is pure and never fails.

pub mod extractor;

pub use extractor::{FEATURE_NAMES, FeatureVector, PLACEHOLDER_FEATURES, extract};
