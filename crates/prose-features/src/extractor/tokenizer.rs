use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Maximal runs of word characters between word boundaries.
static WORD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b").expect("word pattern is valid"));

/// Sentence terminators used by the segmenter.
const SENTENCE_TERMINATORS: [char; 3] = ['.', '!', '?'];

/// Marks counted towards `punctuation_ratio`.
const PUNCTUATION_MARKS: [char; 5] = ['.', ',', ';', '!', '?'];

/// Lowercased word tokens, in order of appearance.
pub fn words(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let tokens = WORD_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_owned())
        .collect::<Vec<_>>();
    debug!(num_words = tokens.len(), "Tokenized words");
    tokens
}

/// Splits on `.`, `!` and `?`, trims each fragment and drops the empty ones.
///
/// Abbreviations and decimal numbers are split like any other terminator.
/// The trained model saw features computed this way, so keep it naive.
pub fn sentences(text: &str) -> Vec<&str> {
    text.split(SENTENCE_TERMINATORS)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

/// Whitespace token count of each sentence.
pub fn sentence_lengths(sentences: &[&str]) -> Vec<usize> {
    sentences
        .iter()
        .map(|sentence| sentence.split_whitespace().count())
        .collect()
}

pub fn punctuation_count(text: &str) -> usize {
    text.chars()
        .filter(|c| PUNCTUATION_MARKS.contains(c))
        .count()
}
