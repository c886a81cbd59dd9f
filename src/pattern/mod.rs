//! Longest-prefix pattern registry.
//!
//! A [`PatternFinder`] maps rune sequences to values of type `T` and answers
//! "what is the longest registered pattern that is a prefix of this text".
//! Two implementations exist: [`trie::TriePatternFinder`] (the one stages
//! use) and [`naive::NaivePatternFinder`] (linear scan, kept to validate the
//! trie against in tests).

mod naive;
mod trie;

pub use naive::NaivePatternFinder;
pub use trie::TriePatternFinder;

use crate::error::{KhiError, KhiResult};

/// A single match produced by [`PatternFinder::match_at`] or
/// [`find_all_with_starter_runes`]. `start`/`end` are rune offsets into the
/// slice that was searched, not byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatchResult<T> {
    pub value: T,
    pub start: usize,
    pub end: usize,
}

/// Longest-prefix registry over rune sequences.
///
/// Implementations must allow any number of concurrent readers to call
/// [`PatternFinder::match_at`] while at most one writer calls
/// [`PatternFinder::add_pattern`] / [`PatternFinder::delete_pattern`]
/// (single-writer, many-readers).
pub trait PatternFinder<T: Clone>: Send + Sync {
    /// Registers `pattern -> value`. Fails with [`KhiError::AlreadyExists`]
    /// if `pattern` is already registered.
    fn add_pattern(&self, pattern: &str, value: T) -> KhiResult<()>;

    /// Returns the value registered under the exact pattern.
    fn get_pattern(&self, pattern: &str) -> KhiResult<T>;

    /// Removes and returns the value registered under the exact pattern.
    fn delete_pattern(&self, pattern: &str) -> KhiResult<T>;

    /// Returns the longest registered pattern that is a prefix of `runes`,
    /// or `None` if no registered pattern is a prefix.
    fn match_at(&self, runes: &[char]) -> Option<PatternMatchResult<T>>;
}

/// Scans `text` left-to-right and returns every non-overlapping match of
/// `finder` found at a "starter" position.
///
/// If `include_first` is true, a match is attempted at position 0 before the
/// scan begins. Otherwise the cursor advances until it finds a rune equal to
/// one of `starters`, then attempts a match on the suffix that starts just
/// after that rune. On a successful match the cursor jumps past `end`; on
/// failure it advances by a single rune. This keeps results ordered,
/// non-overlapping, and the scan deterministic.
pub fn find_all_with_starter_runes<T: Clone>(
    text: &str,
    finder: &dyn PatternFinder<T>,
    include_first: bool,
    starters: &[char],
) -> Vec<PatternMatchResult<T>> {
    let runes: Vec<char> = text.chars().collect();
    let mut results = Vec::new();
    let mut cursor = 0usize;

    if include_first && cursor < runes.len() {
        if let Some(m) = finder.match_at(&runes[cursor..]) {
            let end = cursor + m.end;
            results.push(PatternMatchResult {
                value: m.value,
                start: cursor,
                end,
            });
            cursor = end;
        }
    }

    while cursor < runes.len() {
        if !starters.contains(&runes[cursor]) {
            cursor += 1;
            continue;
        }
        let attempt_start = cursor + 1;
        if attempt_start > runes.len() {
            break;
        }
        match finder.match_at(&runes[attempt_start..]) {
            Some(m) => {
                let end = attempt_start + m.end;
                results.push(PatternMatchResult {
                    value: m.value,
                    start: attempt_start,
                    end,
                });
                cursor = end;
            }
            None => {
                cursor += 1;
            }
        }
    }

    results
}
