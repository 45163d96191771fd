//! Obfuscated number-word arithmetic.
//!
//! Challenges such as "A lobster swiims at twen ty thrree meters per second and
//! slows by seven" are normalized (lowercase, letters only, stretched letters
//! collapsed), scanned for number words, and combined with an operation
//! inferred from keywords in the lightly-normalized original text.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::challenges::detectors::build_regex;

/// A fuzzy candidate may be at most this many characters longer than the
/// dictionary word.
const FUZZY_MAX_EXTRA: usize = 2;
/// A fuzzy candidate may be at most this many characters shorter than the
/// dictionary word.
const FUZZY_MAX_MISSING: usize = 1;
/// Number of consecutive tokens joined when matching a number word.
const MAX_JOINED_TOKENS: usize = 3;
/// Tokens inspected after a tens word when looking for its ones part.
const MAX_COMPOUND_LOOKAHEAD: usize = 2;

const ONES: &[(&str, u32)] = &[
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
];

const TENS: &[(&str, u32)] = &[
    ("twenty", 20),
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
    ("sixty", 60),
    ("seventy", 70),
    ("eighty", 80),
    ("ninety", 90),
];

const FILLER_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "be", "what", "whats", "of", "and", "by", "to", "with",
    "at", "in", "on", "for", "from", "if", "it", "its", "has", "have", "then", "how", "much",
    "many", "total", "result", "answer", "value", "new", "now", "please", "calculate", "compute",
    "find", "um", "uh", "lobster", "lobsters", "claw", "claws", "meter", "meters", "metre",
    "metres", "per", "second", "seconds", "newton", "newtons", "unit", "units", "speed",
    "velocity", "force", "km", "kilometers", "hour", "hours", "minute", "minutes", "degrees",
    "points", "cm", "swims", "exerts", "there", "their", "they", "this", "that", "these",
    "those", "into", "so", "do", "does", "will", "can", "each", "after", "when",
];

#[derive(Debug)]
struct NumberWord {
    word: String,
    value: u32,
}

fn normalized_dictionary(entries: &[(&str, u32)]) -> Vec<NumberWord> {
    entries
        .iter()
        .map(|(word, value)| NumberWord {
            word: normalize_challenge(word),
            value: *value,
        })
        .collect()
}

static ONES_DICT: Lazy<Vec<NumberWord>> = Lazy::new(|| normalized_dictionary(ONES));
static TENS_DICT: Lazy<Vec<NumberWord>> = Lazy::new(|| normalized_dictionary(TENS));
static FILLER: Lazy<HashSet<String>> =
    Lazy::new(|| FILLER_WORDS.iter().map(|word| normalize_challenge(word)).collect());

static MULTIPLY_RE: Lazy<Regex> = Lazy::new(|| build_regex(r"times|multipl|product"));
static DIVIDE_RE: Lazy<Regex> = Lazy::new(|| build_regex(r"divid|quotient|split"));
static SUBTRACT_RE: Lazy<Regex> = Lazy::new(|| {
    build_regex(
        r"minus|subtract|\bless\b|fewer|takes? away|remov|decreas|reduc|\blos(?:e|es|t|ing)\b|\bdrop|\bslow|remain|\bleft\b",
    )
});

/// Arithmetic operation inferred from challenge wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
}

/// Lowercase, keep letters and spaces, collapse stretched letters and whitespace.
pub fn normalize_challenge(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous: Option<char> = None;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphabetic() {
            if previous != Some(c) {
                out.push(c);
            }
            previous = Some(c);
        } else if c.is_whitespace() {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
            previous = None;
        }
    }
    out.trim_end().to_string()
}

/// Lowercase, keep letters and spaces, collapse whitespace. Letters are not
/// deduplicated so inflected keywords ("subtracts") stay intact.
pub fn lightly_normalize(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number words found in normalized challenge text, in order of appearance.
pub fn extract_numbers(normalized: &str) -> Vec<f64> {
    let tokens: Vec<&str> = normalized
        .split(' ')
        .filter(|token| !token.is_empty() && !FILLER.contains(*token))
        .collect();

    let mut numbers = Vec::new();
    let mut pos = 0;
    while pos < tokens.len() {
        let Some((value, consumed, is_tens)) = match_number_at(&tokens, pos) else {
            pos += 1;
            continue;
        };
        pos += consumed;

        let mut total = value;
        if is_tens && let Some((ones, used)) = match_compound_ones(&tokens, pos) {
            total += ones;
            pos += used;
        }
        numbers.push(f64::from(total));
    }
    numbers
}

fn joined(tokens: &[&str], start: usize, len: usize) -> Option<String> {
    (start + len <= tokens.len()).then(|| tokens[start..start + len].concat())
}

/// Match a ones/teens or tens word starting at `start`: exact matches over the
/// longest join first, then fuzzy matches over the shortest join first.
fn match_number_at(tokens: &[&str], start: usize) -> Option<(u32, usize, bool)> {
    for len in (1..=MAX_JOINED_TOKENS).rev() {
        let Some(candidate) = joined(tokens, start, len) else {
            continue;
        };
        if let Some(entry) = TENS_DICT.iter().find(|entry| entry.word == candidate) {
            return Some((entry.value, len, true));
        }
        if let Some(entry) = ONES_DICT.iter().find(|entry| entry.word == candidate) {
            return Some((entry.value, len, false));
        }
    }

    for len in 1..=MAX_JOINED_TOKENS {
        let Some(candidate) = joined(tokens, start, len) else {
            break;
        };
        if let Some((entry, is_tens)) = closest_fuzzy(&candidate) {
            return Some((entry.value, len, is_tens));
        }
    }

    None
}

/// Fuzzy match across both dictionaries, preferring the word whose length is
/// closest to the candidate. Ties go to the ones word.
fn closest_fuzzy(candidate: &str) -> Option<(&'static NumberWord, bool)> {
    let candidate_len = candidate.chars().count();
    let ones = ONES_DICT.iter().map(|entry| (entry, false));
    let tens = TENS_DICT.iter().map(|entry| (entry, true));

    ones.chain(tens)
        .filter(|(entry, _)| fuzzy_match(candidate, &entry.word))
        .min_by_key(|(entry, _)| entry.word.chars().count().abs_diff(candidate_len))
}

fn match_compound_ones(tokens: &[&str], start: usize) -> Option<(u32, usize)> {
    let digits = || ONES_DICT.iter().filter(|entry| (1..=9).contains(&entry.value));

    for len in (1..=MAX_COMPOUND_LOOKAHEAD).rev() {
        let Some(candidate) = joined(tokens, start, len) else {
            continue;
        };
        if let Some(entry) = digits().find(|entry| entry.word == candidate) {
            return Some((entry.value, len));
        }
    }

    for len in 1..=MAX_COMPOUND_LOOKAHEAD {
        let Some(candidate) = joined(tokens, start, len) else {
            break;
        };
        if let Some(entry) = digits().find(|entry| fuzzy_match(&candidate, &entry.word)) {
            return Some((entry.value, len));
        }
    }

    None
}

/// Subsequence match with a `+2/-1` length window around the dictionary word.
fn fuzzy_match(candidate: &str, word: &str) -> bool {
    let (candidate_len, word_len) = (candidate.chars().count(), word.chars().count());
    if candidate_len > word_len + FUZZY_MAX_EXTRA
        || candidate_len + FUZZY_MAX_MISSING < word_len
    {
        return false;
    }
    if candidate_len >= word_len {
        is_subsequence(word, candidate)
    } else {
        is_subsequence(candidate, word)
    }
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut haystack = haystack.chars();
    needle.chars().all(|c| haystack.any(|h| h == c))
}

/// Keyword-based operation detection: multiply, then divide, then subtract,
/// defaulting to addition.
pub fn detect_operation(lightly_normalized: &str) -> Operation {
    if MULTIPLY_RE.is_match(lightly_normalized) {
        Operation::Mul
    } else if DIVIDE_RE.is_match(lightly_normalized) {
        Operation::Div
    } else if SUBTRACT_RE.is_match(lightly_normalized) {
        Operation::Sub
    } else {
        Operation::Add
    }
}

/// Fold the numbers left to right. Needs at least two numbers; division by
/// zero yields `None`.
pub fn compute(numbers: &[f64], op: Operation) -> Option<f64> {
    let (first, rest) = numbers.split_first()?;
    if rest.is_empty() {
        return None;
    }

    rest.iter().try_fold(*first, |acc, &value| match op {
        Operation::Add => Some(acc + value),
        Operation::Sub => Some(acc - value),
        Operation::Mul => Some(acc * value),
        Operation::Div => (value != 0.0).then(|| acc / value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_collapses_stretched_letters() {
        assert_eq!(normalize_challenge("  ThIIIrrTEEEN,  Lob-ster!! "), "thirten lobster");
        assert_eq!(normalize_challenge("twenty   three"), "twenty thre");
    }

    #[test]
    fn light_normalization_keeps_double_letters() {
        assert_eq!(lightly_normalize("It SUBTRACTS 3, then adds!"), "it subtracts then adds");
    }

    #[test]
    fn compound_numbers() {
        assert_eq!(extract_numbers(&normalize_challenge("twenty three")), vec![23.0]);
        assert_eq!(
            extract_numbers(&normalize_challenge("ninety nine and forty")),
            vec![99.0, 40.0]
        );
    }

    #[test]
    fn split_and_stretched_words() {
        assert_eq!(
            extract_numbers(&normalize_challenge("thir teen plus fiiiive")),
            vec![13.0, 5.0]
        );
        assert_eq!(extract_numbers(&normalize_challenge("twen ty thr ee")), vec![23.0]);
        assert_eq!(
            extract_numbers(&normalize_challenge("se ven teen minus four")),
            vec![17.0, 4.0]
        );
    }

    #[test]
    fn fuzzy_matching_is_length_bounded() {
        assert!(fuzzy_match("fourty", "forty"));
        assert!(fuzzy_match("sevn", "seven"));
        assert!(!fuzzy_match("tentacles", "ten"));
        assert!(!fuzzy_match("tw", "twelve"));
        assert_eq!(
            extract_numbers(&normalize_challenge("the tentacles grab ten fish")),
            vec![10.0]
        );
    }

    #[test]
    fn misspelled_tens_beat_shorter_ones_words() {
        assert_eq!(extract_numbers(&normalize_challenge("fourty")), vec![40.0]);
        assert_eq!(extract_numbers(&normalize_challenge("fourty two")), vec![42.0]);
        assert_eq!(
            extract_numbers(&normalize_challenge("sevnty plus sixx")),
            vec![70.0, 6.0]
        );
    }

    #[test]
    fn common_prose_words_are_not_numbers() {
        assert_eq!(
            extract_numbers(&normalize_challenge("there are twenty lobsters plus seven")),
            vec![20.0, 7.0]
        );
        assert_eq!(
            extract_numbers(&normalize_challenge("their claws exert nine newtons each")),
            vec![9.0]
        );
    }

    #[test]
    fn filler_words_are_ignored() {
        let text = "A lobster swims at thirty two meters per second and then adds six";
        assert_eq!(extract_numbers(&normalize_challenge(text)), vec![32.0, 6.0]);
    }

    #[test]
    fn operation_keywords() {
        assert_eq!(detect_operation("ten minus three"), Operation::Sub);
        assert_eq!(detect_operation("it subtracts four"), Operation::Sub);
        assert_eq!(detect_operation("seven times six"), Operation::Mul);
        assert_eq!(detect_operation("twenty divided by four"), Operation::Div);
        assert_eq!(detect_operation("ten plus three"), Operation::Add);
        assert_eq!(
            detect_operation("multiply after the lobster slows"),
            Operation::Mul
        );
    }

    #[test]
    fn compute_folds_left_to_right() {
        assert_eq!(compute(&[10.0, 3.0], Operation::Sub), Some(7.0));
        assert_eq!(compute(&[20.0, 2.0, 5.0], Operation::Div), Some(2.0));
        assert_eq!(compute(&[2.0, 3.0, 4.0], Operation::Mul), Some(24.0));
        assert_eq!(compute(&[1.0, 2.0, 3.0], Operation::Add), Some(6.0));
        assert_eq!(compute(&[4.0, 0.0], Operation::Div), None);
        assert_eq!(compute(&[4.0], Operation::Add), None);
        assert_eq!(compute(&[], Operation::Add), None);
    }
}
