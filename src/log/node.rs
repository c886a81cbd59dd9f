//! The canonical document tree every [`super::Log`] wraps.

use std::collections::BTreeMap;

/// A scalar leaf value in the node tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            Scalar::Float(f) => Some(*f as i64),
            _ => None,
        }
    }
}

/// A node in the structured document: a map, a sequence, or a scalar.
/// `Map` uses a `BTreeMap` so iteration order (and therefore any
/// serialization derived from it) is deterministic, matching the
/// determinism invariant on path reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Map(BTreeMap<String, Node>),
    Seq(Vec<Node>),
    Scalar(Scalar),
}

impl Node {
    pub fn map(entries: impl IntoIterator<Item = (String, Node)>) -> Self {
        Node::Map(entries.into_iter().collect())
    }

    pub fn str(s: impl Into<String>) -> Self {
        Node::Scalar(Scalar::Str(s.into()))
    }

    pub fn int(i: i64) -> Self {
        Node::Scalar(Scalar::Int(i))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }
}

/// Splits a dotted path into segments, treating `\.` as a literal dot
/// rather than a separator. Path reads are deterministic and escape-aware.
pub fn split_path(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'.') => {
                current.push('.');
                chars.next();
            }
            '.' => {
                segments.push(std::mem::take(&mut current));
            }
            other => current.push(other),
        }
    }
    segments.push(current);
    segments
}

/// Read-only, path-addressed view over a [`Node`] tree.
pub struct NodeReader<'a> {
    root: &'a Node,
}

impl<'a> NodeReader<'a> {
    pub fn new(root: &'a Node) -> Self {
        Self { root }
    }

    /// Navigates `path` (dot-separated, escape-aware) and returns the node
    /// found there, or `None` if any segment is missing.
    pub fn get(&self, path: &str) -> Option<&'a Node> {
        let segments = split_path(path);
        let mut current = self.root;
        for segment in segments {
            if segment.is_empty() {
                continue;
            }
            match current {
                Node::Map(map) => {
                    current = map.get(&segment)?;
                }
                Node::Seq(seq) => {
                    let idx: usize = segment.parse().ok()?;
                    current = seq.get(idx)?;
                }
                Node::Scalar(_) => return None,
            }
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str) -> Option<&'a str> {
        self.get(path)?.as_scalar()?.as_str()
    }

    pub fn get_int(&self, path: &str) -> Option<i64> {
        self.get(path)?.as_scalar()?.as_int()
    }

    pub fn root(&self) -> &'a Node {
        self.root
    }
}
