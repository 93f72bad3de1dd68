mod readability;
mod tokenizer;

use ahash::HashSet;
use tracing::debug;

pub use readability::{
    FALLBACK_SCORE, ReadabilityError, ReadabilityScore, flesch_reading_ease, syllable_count,
};
pub use tokenizer::{punctuation_count, sentence_lengths, sentences, words};

pub const WORD_COUNT: &str = "word_count";
pub const CHARACTER_COUNT: &str = "character_count";
pub const SENTENCE_COUNT: &str = "sentence_count";
pub const LEXICAL_DIVERSITY: &str = "lexical_diversity";
pub const AVG_SENTENCE_LENGTH: &str = "avg_sentence_length";
pub const AVG_WORD_LENGTH: &str = "avg_word_length";
pub const PUNCTUATION_RATIO: &str = "punctuation_ratio";
pub const BURSTINESS: &str = "burstiness";
pub const FLESCH_READING_EASE: &str = "flesch_reading_ease";
pub const GRAMMAR_ERRORS: &str = "grammar_errors";
pub const GUNNING_FOG_INDEX: &str = "gunning_fog_index";
pub const PASSIVE_VOICE_RATIO: &str = "passive_voice_ratio";
pub const PREDICTABILITY_SCORE: &str = "predictability_score";

/// Every feature produced by [`extract`], in output order.
pub const FEATURE_NAMES: [&str; 13] = [
    WORD_COUNT,
    CHARACTER_COUNT,
    SENTENCE_COUNT,
    LEXICAL_DIVERSITY,
    AVG_SENTENCE_LENGTH,
    AVG_WORD_LENGTH,
    PUNCTUATION_RATIO,
    BURSTINESS,
    FLESCH_READING_EASE,
    GRAMMAR_ERRORS,
    GUNNING_FOG_INDEX,
    PASSIVE_VOICE_RATIO,
    PREDICTABILITY_SCORE,
];

/// Features kept in the schema of older models but never computed.
pub const PLACEHOLDER_FEATURES: [&str; 4] = [
    GRAMMAR_ERRORS,
    GUNNING_FOG_INDEX,
    PASSIVE_VOICE_RATIO,
    PREDICTABILITY_SCORE,
];

/// Named numeric measurements of one passage of text.
///
/// Behaves as a map from feature name to value. Names keep the order in which
/// they were first inserted so the vector displays the same way every time,
/// but two vectors with the same entries are equal whatever their order.
#[derive(Clone, Debug, Default)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == name)
    }

    /// Set `name` to `value`, appending it if the name is new.
    ///
    /// Returns the previous value, if any.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        let name = name.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for FeatureVector {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }
}

impl<N: Into<String>> FromIterator<(N, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (N, f64)>>(iter: I) -> Self {
        let mut vector = Self::new();
        for (name, value) in iter {
            vector.insert(name, value);
        }
        vector
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use std::fmt;

    use serde::{
        Deserialize, Deserializer, Serialize, Serializer,
        de::{MapAccess, Visitor},
        ser::SerializeMap,
    };

    use super::FeatureVector;

    // As a JSON object, keeping insertion order.
    impl Serialize for FeatureVector {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (name, value) in self.iter() {
                map.serialize_entry(name, &value)?;
            }
            map.end()
        }
    }

    struct FeatureVectorVisitor;

    impl<'de> Visitor<'de> for FeatureVectorVisitor {
        type Value = FeatureVector;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of feature names to numbers")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut vector = FeatureVector::new();
            while let Some((name, value)) = access.next_entry::<String, f64>()? {
                vector.insert(name, value);
            }
            Ok(vector)
        }
    }

    impl<'de> Deserialize<'de> for FeatureVector {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_map(FeatureVectorVisitor)
        }
    }
}

/// `numerator / denominator`, or 0 when the denominator is 0.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

fn mean(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<usize>() as f64 / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values
        .iter()
        .map(|&v| (v as f64 - mean).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

/// Compute the full feature vector for `text`.
///
/// Never fails: zero denominators yield 0 and an unavailable readability score
/// yields [`FALLBACK_SCORE`]. The same text always produces the same vector.
#[must_use]
pub fn extract(text: &str) -> FeatureVector {
    let words = tokenizer::words(text);
    let sentences = tokenizer::sentences(text);
    let sentence_lengths = tokenizer::sentence_lengths(&sentences);

    let word_count = words.len() as f64;
    let character_count = text.chars().count() as f64;
    let sentence_count = sentences.len() as f64;

    let distinct_words = words.iter().collect::<HashSet<_>>().len() as f64;
    let lexical_diversity = ratio(distinct_words, word_count);
    // total characters (whitespace included) per token
    let avg_word_length = ratio(character_count, word_count);
    let punctuation_ratio = ratio(
        tokenizer::punctuation_count(text) as f64,
        character_count,
    );
    let avg_sentence_length = mean(&sentence_lengths);
    let burstiness = ratio(std_dev(&sentence_lengths), avg_sentence_length);
    let readability = ReadabilityScore::of(text);

    debug!(
        word_count,
        sentence_count,
        readability_fallback = readability.is_fallback(),
        "Extracted features"
    );

    let mut vector = FeatureVector::from_iter([
        (WORD_COUNT, word_count),
        (CHARACTER_COUNT, character_count),
        (SENTENCE_COUNT, sentence_count),
        (LEXICAL_DIVERSITY, lexical_diversity),
        (AVG_SENTENCE_LENGTH, avg_sentence_length),
        (AVG_WORD_LENGTH, avg_word_length),
        (PUNCTUATION_RATIO, punctuation_ratio),
        (BURSTINESS, burstiness),
        (FLESCH_READING_EASE, readability.value()),
    ]);
    for name in PLACEHOLDER_FEATURES {
        vector.insert(name, 0.0);
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn feature(vector: &FeatureVector, name: &str) -> f64 {
        vector
            .get(name)
            .unwrap_or_else(|| panic!("missing feature {name}"))
    }

    #[test]
    fn test_extract_produces_all_features_in_order() {
        let vector = extract("Some text. More text!");
        assert_eq!(vector.len(), 13);
        assert!(vector.names().eq(FEATURE_NAMES));
    }

    #[test]
    fn test_extract_cat_scenario() {
        let text = "The cat sat. The cat ran fast!";
        let vector = extract(text);

        assert_eq!(feature(&vector, WORD_COUNT), 7.0);
        assert_eq!(feature(&vector, CHARACTER_COUNT), 30.0);
        assert_eq!(feature(&vector, SENTENCE_COUNT), 2.0);
        assert!((feature(&vector, AVG_SENTENCE_LENGTH) - 3.5).abs() < EPSILON);
        assert!((feature(&vector, LEXICAL_DIVERSITY) - 5.0 / 7.0).abs() < EPSILON);
        assert!((feature(&vector, BURSTINESS) - 0.5 / 3.5).abs() < EPSILON);
        assert!((feature(&vector, AVG_WORD_LENGTH) - 30.0 / 7.0).abs() < EPSILON);
        assert!((feature(&vector, PUNCTUATION_RATIO) - 2.0 / 30.0).abs() < EPSILON);
        assert!(feature(&vector, FLESCH_READING_EASE) > 0.0);
    }

    #[test]
    fn test_extract_empty_text() {
        let vector = extract("");
        assert_eq!(vector.len(), 13);
        for (name, value) in vector.iter() {
            assert_eq!(value, 0.0, "{name} should be 0 for empty text");
        }
    }

    #[test]
    fn test_extract_text_without_words() {
        let vector = extract("?!.");
        assert_eq!(feature(&vector, WORD_COUNT), 0.0);
        assert_eq!(feature(&vector, AVG_WORD_LENGTH), 0.0);
        assert_eq!(feature(&vector, LEXICAL_DIVERSITY), 0.0);
        assert_eq!(feature(&vector, BURSTINESS), 0.0);
        assert_eq!(feature(&vector, SENTENCE_COUNT), 0.0);
        assert_eq!(feature(&vector, CHARACTER_COUNT), 3.0);
        assert!((feature(&vector, PUNCTUATION_RATIO) - 1.0).abs() < EPSILON);
        assert_eq!(feature(&vector, FLESCH_READING_EASE), FALLBACK_SCORE);
    }

    #[test]
    fn test_extract_symbols_only_falls_back() {
        let vector = extract("\u{2014} \u{2014}");
        assert_eq!(feature(&vector, WORD_COUNT), 0.0);
        assert_eq!(feature(&vector, FLESCH_READING_EASE), FALLBACK_SCORE);
    }

    #[test]
    fn test_extract_numbers_score_like_short_words() {
        let vector = extract("42 99");
        assert_eq!(feature(&vector, WORD_COUNT), 2.0);
        let score = feature(&vector, FLESCH_READING_EASE);
        assert!((score - 120.205).abs() < 0.01, "score was {score}");
    }

    #[test]
    fn test_lexical_diversity_bounds() {
        let unique = extract("alpha beta gamma delta");
        assert!((feature(&unique, LEXICAL_DIVERSITY) - 1.0).abs() < EPSILON);

        let repeated = extract("echo Echo ECHO echo");
        assert!((feature(&repeated, LEXICAL_DIVERSITY) - 0.25).abs() < EPSILON);

        for text in ["", "a a b", "One two. Three one two!", "x"] {
            let value = feature(&extract(text), LEXICAL_DIVERSITY);
            assert!((0.0..=1.0).contains(&value), "{value} out of range for {text:?}");
        }
    }

    #[test]
    fn test_uniform_sentences_have_zero_burstiness() {
        let vector = extract("One two three. Four five six. Seven eight nine.");
        assert!(feature(&vector, BURSTINESS).abs() < EPSILON);
    }

    #[test]
    fn test_placeholders_are_zero() {
        let vector = extract("A perfectly ordinary sentence, written by someone.");
        for name in PLACEHOLDER_FEATURES {
            assert_eq!(feature(&vector, name), 0.0);
        }
    }

    #[test]
    fn test_extract_is_deterministic() {
        let text = "Dr. Smith arrived at 3.30 p.m.; nobody noticed! Why would they?";
        let first = extract(text);
        let second = extract(text);
        assert_eq!(first, second);
        for ((_, a), (_, b)) in first.iter().zip(second.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_all_features_are_finite() {
        for text in ["", " ", "...", "word", "Ünïcödé tëxt — ok?", "a.b.c.d", "\n\n\t"] {
            for (name, value) in extract(text).iter() {
                assert!(value.is_finite(), "{name} not finite for {text:?}");
            }
        }
    }

    #[test]
    fn test_character_count_uses_unicode_scalars() {
        let vector = extract("héllo wörld");
        assert_eq!(feature(&vector, CHARACTER_COUNT), 11.0);
    }

    #[test]
    fn test_feature_vector_insert_and_replace() {
        let mut vector = FeatureVector::new();
        assert!(vector.is_empty());
        assert_eq!(vector.insert("a", 1.0), None);
        assert_eq!(vector.insert("b", 2.0), None);
        assert_eq!(vector.insert("a", 3.0), Some(1.0));
        assert_eq!(vector.get("a"), Some(3.0));
        assert!(vector.contains("b"));
        assert!(!vector.contains("c"));
        assert!(vector.names().eq(["a", "b"]));
    }

    #[test]
    fn test_feature_vector_equality_ignores_order() {
        let forward = FeatureVector::from_iter([("a", 1.0), ("b", 2.0)]);
        let backward = FeatureVector::from_iter([("b", 2.0), ("a", 1.0)]);
        assert_eq!(forward, backward);
        assert!(!forward.names().eq(backward.names()));

        assert_ne!(forward, FeatureVector::from_iter([("a", 1.0), ("b", 3.0)]));
        assert_ne!(forward, FeatureVector::from_iter([("a", 1.0)]));
        assert_ne!(
            forward,
            FeatureVector::from_iter([("a", 1.0), ("b", 2.0), ("c", 0.0)])
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_feature_vector_serializes() {
        let vector = FeatureVector::from_iter([("word_count", 2.0), ("burstiness", 0.5)]);
        let json = serde_json::to_string(&vector).unwrap();
        assert_eq!(json, r#"{"word_count":2.0,"burstiness":0.5}"#);
        let back: FeatureVector = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vector);
    }
}
