use std::sync::RwLock;

use crate::error::{KhiError, KhiResult};

use super::{PatternFinder, PatternMatchResult};

/// Linear-scan [`PatternFinder`]. Kept alongside [`super::TriePatternFinder`]
/// purely to cross-check the trie in tests: both must agree on every
/// `match_at` call.
pub struct NaivePatternFinder<T> {
    patterns: RwLock<Vec<(String, T)>>,
}

impl<T: Clone> NaivePatternFinder<T> {
    pub fn new() -> Self {
        Self {
            patterns: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Clone> Default for NaivePatternFinder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> PatternFinder<T> for NaivePatternFinder<T> {
    fn add_pattern(&self, pattern: &str, value: T) -> KhiResult<()> {
        if pattern.is_empty() {
            return Err(KhiError::InvalidInput("pattern must not be empty".into()));
        }
        let mut patterns = self.patterns.write().expect("pattern list lock poisoned");
        if patterns.iter().any(|(p, _)| p == pattern) {
            return Err(KhiError::AlreadyExists(pattern.to_string()));
        }
        patterns.push((pattern.to_string(), value));
        Ok(())
    }

    fn get_pattern(&self, pattern: &str) -> KhiResult<T> {
        let patterns = self.patterns.read().expect("pattern list lock poisoned");
        patterns
            .iter()
            .find(|(p, _)| p == pattern)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| KhiError::NotFound(pattern.to_string()))
    }

    fn delete_pattern(&self, pattern: &str) -> KhiResult<T> {
        let mut patterns = self.patterns.write().expect("pattern list lock poisoned");
        let idx = patterns
            .iter()
            .position(|(p, _)| p == pattern)
            .ok_or_else(|| KhiError::NotFound(pattern.to_string()))?;
        Ok(patterns.remove(idx).1)
    }

    fn match_at(&self, runes: &[char]) -> Option<PatternMatchResult<T>> {
        let patterns = self.patterns.read().expect("pattern list lock poisoned");
        let mut best: Option<(usize, &T)> = None;
        for (pattern, value) in patterns.iter() {
            let pattern_runes: Vec<char> = pattern.chars().collect();
            if pattern_runes.len() > runes.len() {
                continue;
            }
            if runes[..pattern_runes.len()] == pattern_runes[..] {
                let is_longer = best.map(|(len, _)| pattern_runes.len() > len).unwrap_or(true);
                if is_longer {
                    best = Some((pattern_runes.len(), value));
                }
            }
        }
        best.map(|(end, value)| PatternMatchResult {
            value: value.clone(),
            start: 0,
            end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::trie::TriePatternFinder;
    use super::*;

    #[test]
    fn naive_and_trie_agree_on_longest_prefix() {
        let naive: NaivePatternFinder<i32> = NaivePatternFinder::new();
        let trie: TriePatternFinder<i32> = TriePatternFinder::new();
        for (pattern, value) in [("cat", 1), ("catalog", 3), ("dog", 2), ("do", 9)] {
            naive.add_pattern(pattern, value).unwrap();
            trie.add_pattern(pattern, value).unwrap();
        }

        for text in ["catalogue", "category", "dogma", "doze", "elephant"] {
            let runes: Vec<char> = text.chars().collect();
            assert_eq!(naive.match_at(&runes), trie.match_at(&runes), "mismatch for {text}");
        }
    }
}
