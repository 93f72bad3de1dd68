//! Flesch Reading Ease with an explicit fallback.
//!
//! Words and sentences are counted the way the trained model's readability
//! library counts them, which differs from the extractor's own tokenizer:
//! punctuation and symbols are deleted before splitting on whitespace, and
//! fragments of two words or fewer do not count as sentences.
//!
//! The score is undefined for text without words. Instead of swallowing the
//! failure, [`ReadabilityScore`] records whether the value was
//! computed or replaced by the `0.0` fallback, and why.

use tracing::warn;

use super::tokenizer;

const FLESCH_BASE: f64 = 206.835;
const FLESCH_SENTENCE_WEIGHT: f64 = 1.015;
const FLESCH_SYLLABLE_WEIGHT: f64 = 84.6;

/// Value used in place of a score that could not be computed.
pub const FALLBACK_SCORE: f64 = 0.0;

const VOWELS: &[char] = &['a', 'e', 'i', 'o', 'u', 'y'];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReadabilityError {
    #[error("text contains no words")]
    NoWords,
    #[error("score is not a finite number: {0}")]
    NonFinite(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadabilityScore {
    Computed(f64),
    Fallback(ReadabilityError),
}

impl ReadabilityScore {
    /// Score the text, falling back to [`FALLBACK_SCORE`] on failure.
    #[must_use]
    pub fn of(text: &str) -> Self {
        flesch_reading_ease(text).into()
    }

    #[must_use]
    pub fn value(&self) -> f64 {
        match self {
            Self::Computed(score) => *score,
            Self::Fallback(_) => FALLBACK_SCORE,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

impl From<Result<f64, ReadabilityError>> for ReadabilityScore {
    fn from(result: Result<f64, ReadabilityError>) -> Self {
        match result {
            Ok(score) => Self::Computed(score),
            Err(reason) => {
                warn!(%reason, "Readability score unavailable, using fallback");
                Self::Fallback(reason)
            }
        }
    }
}

/// `206.835 - 1.015 * (words / sentences) - 84.6 * (syllables / words)`,
/// rounded to two decimals.
pub fn flesch_reading_ease(text: &str) -> Result<f64, ReadabilityError> {
    let lexicon = lexicon(text);
    if lexicon.is_empty() {
        return Err(ReadabilityError::NoWords);
    }
    let sentence_count = sentence_count(text);

    let word_count = lexicon.len() as f64;
    let syllables = lexicon.iter().map(|w| syllable_count(w)).sum::<usize>() as f64;

    let score = FLESCH_BASE
        - FLESCH_SENTENCE_WEIGHT * (word_count / sentence_count as f64)
        - FLESCH_SYLLABLE_WEIGHT * (syllables / word_count);
    let score = (score * 100.0).round() / 100.0;

    if score.is_finite() {
        Ok(score)
    } else {
        Err(ReadabilityError::NonFinite(score))
    }
}

/// Fragments with fewer words than this are not counted as sentences.
const MIN_SENTENCE_WORDS: usize = 3;

/// Text with everything but word characters and whitespace deleted, split on
/// whitespace. `"3.14"` is one word, a lone dash is none.
fn lexicon(text: &str) -> Vec<String> {
    text.chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

/// Naive fragments with at least [`MIN_SENTENCE_WORDS`] lexicon words, never
/// fewer than one.
fn sentence_count(text: &str) -> usize {
    tokenizer::sentences(text)
        .into_iter()
        .filter(|fragment| lexicon(fragment).len() >= MIN_SENTENCE_WORDS)
        .count()
        .max(1)
}

/// Vowel-group estimate of the syllables in a word.
///
/// Any non-empty word has at least one, including numbers.
pub fn syllable_count(word: &str) -> usize {
    if word.is_empty() {
        return 0;
    }
    let letters = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .collect::<Vec<_>>();
    if letters.len() <= 3 {
        return 1;
    }

    let is_vowel = |c: &char| VOWELS.contains(c);
    let mut groups = 0;
    let mut in_group = false;
    for c in &letters {
        let vowel = is_vowel(c);
        if vowel && !in_group {
            groups += 1;
        }
        in_group = vowel;
    }

    let n = letters.len();
    // consonant + "le" keeps its own syllable ("ta-ble")
    let silent_e = letters.ends_with(&['e'])
        && !(letters.ends_with(&['l', 'e']) && !is_vowel(&letters[n - 3]));
    // "-ed" is silent unless it follows t or d ("want-ed")
    let silent_ed = letters.ends_with(&['e', 'd']) && !matches!(letters[n - 3], 't' | 'd');

    if (silent_e || silent_ed) && groups > 1 {
        groups -= 1;
    }
    groups.max(1)
}
