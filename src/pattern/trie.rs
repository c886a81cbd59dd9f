use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{KhiError, KhiResult};

use super::{PatternFinder, PatternMatchResult};

struct TrieNode<T> {
    children: HashMap<char, TrieNode<T>>,
    value: Option<T>,
}

impl<T> TrieNode<T> {
    fn empty() -> Self {
        Self {
            children: HashMap::new(),
            value: None,
        }
    }
}

/// `O(L)` prefix-matching [`PatternFinder`] backed by a rune trie, guarded by
/// a single `RwLock` so any number of readers can call [`PatternFinder::match_at`]
/// concurrently with at most one in-flight writer.
pub struct TriePatternFinder<T> {
    root: RwLock<TrieNode<T>>,
}

impl<T: Clone> TriePatternFinder<T> {
    pub fn new() -> Self {
        Self {
            root: RwLock::new(TrieNode::empty()),
        }
    }
}

impl<T: Clone> Default for TriePatternFinder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> PatternFinder<T> for TriePatternFinder<T> {
    fn add_pattern(&self, pattern: &str, value: T) -> KhiResult<()> {
        if pattern.is_empty() {
            return Err(KhiError::InvalidInput("pattern must not be empty".into()));
        }
        let mut root = self.root.write().expect("pattern trie lock poisoned");
        let mut node = &mut *root;
        for c in pattern.chars() {
            node = node.children.entry(c).or_insert_with(TrieNode::empty);
        }
        if node.value.is_some() {
            return Err(KhiError::AlreadyExists(pattern.to_string()));
        }
        node.value = Some(value);
        Ok(())
    }

    fn get_pattern(&self, pattern: &str) -> KhiResult<T> {
        let root = self.root.read().expect("pattern trie lock poisoned");
        let mut node = &*root;
        for c in pattern.chars() {
            node = match node.children.get(&c) {
                Some(n) => n,
                None => return Err(KhiError::NotFound(pattern.to_string())),
            };
        }
        node.value
            .clone()
            .ok_or_else(|| KhiError::NotFound(pattern.to_string()))
    }

    fn delete_pattern(&self, pattern: &str) -> KhiResult<T> {
        let mut root = self.root.write().expect("pattern trie lock poisoned");
        let mut node = &mut *root;
        for c in pattern.chars() {
            node = match node.children.get_mut(&c) {
                Some(n) => n,
                None => return Err(KhiError::NotFound(pattern.to_string())),
            };
        }
        node.value
            .take()
            .ok_or_else(|| KhiError::NotFound(pattern.to_string()))
    }

    fn match_at(&self, runes: &[char]) -> Option<PatternMatchResult<T>> {
        let root = self.root.read().expect("pattern trie lock poisoned");
        let mut node = &*root;
        let mut best: Option<(usize, &T)> = None;
        for (i, c) in runes.iter().enumerate() {
            match node.children.get(c) {
                Some(next) => {
                    node = next;
                    if let Some(value) = &node.value {
                        best = Some((i + 1, value));
                    }
                }
                None => break,
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
    use super::*;

    #[test]
    fn get_and_delete_roundtrip() {
        let finder: TriePatternFinder<&str> = TriePatternFinder::new();
        finder.add_pattern("abc", "v").unwrap();
        assert_eq!(finder.get_pattern("abc").unwrap(), "v");
        assert_eq!(finder.delete_pattern("abc").unwrap(), "v");
        assert!(finder.get_pattern("abc").is_err());
    }

    #[test]
    fn match_at_empty_trie_returns_none() {
        let finder: TriePatternFinder<&str> = TriePatternFinder::new();
        assert!(finder.match_at(&['a', 'b']).is_none());
    }
}
