//! Structured log parsing kernel.
//!
//! Every parser here is tolerant: a malformed line never produces an error,
//! it produces the best-effort result the grammar allows. [`StructuredLogResult::fields`] always carries at
//! least `@original`.

mod containerd;
mod klog;
mod logfmt;
mod pool;
mod raw;

pub use containerd::ContainerdParser;
pub use klog::KlogParser;
pub use logfmt::LogfmtParser;
pub use pool::{ParserHandle, ParserPool};
pub use raw::RawFallbackParser;

use std::collections::HashMap;

/// Severity levels derivable from a structured log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Fatal,
}

/// A single extracted field value. Structured parsers only ever produce
/// strings, treating klog/logfmt values as opaque text; downstream readers
/// reinterpret as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
}

impl FieldValue {
    pub fn as_str(&self) -> &str {
        match self {
            FieldValue::Text(s) => s,
        }
    }
}

pub const FIELD_ORIGINAL: &str = "@original";
pub const FIELD_MSG: &str = "@msg";
pub const FIELD_SEVERITY: &str = "@severity";
pub const FIELD_DATE: &str = "@date";
pub const FIELD_TIME: &str = "@time";
pub const FIELD_THREAD_ID: &str = "@threadid";
pub const FIELD_SOURCE: &str = "@source";

/// The common result every [`StructuredLogParser`] produces.
#[derive(Debug, Clone, Default)]
pub struct StructuredLogResult {
    pub fields: HashMap<String, FieldValue>,
}

impl StructuredLogResult {
    pub fn with_original(original: &str) -> Self {
        let mut fields = HashMap::new();
        fields.insert(FIELD_ORIGINAL.to_string(), FieldValue::Text(original.to_string()));
        Self { fields }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.fields.insert(key.to_string(), FieldValue::Text(value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(|v| v.as_str())
    }

    pub fn msg(&self) -> Option<&str> {
        self.get(FIELD_MSG)
    }

    pub fn severity(&self) -> Option<Severity> {
        match self.get(FIELD_SEVERITY) {
            Some("Info") => Some(Severity::Info),
            Some("Warning") => Some(Severity::Warning),
            Some("Error") => Some(Severity::Error),
            Some("Fatal") => Some(Severity::Fatal),
            _ => None,
        }
    }
}

/// A parser attempts to interpret a raw log message as a structured
/// document. Implementations must never panic on malformed input; they
/// return `None` instead (raw fallback always succeeds).
pub trait StructuredLogParser: Send + Sync {
    fn try_parse(&self, message: &str) -> Option<StructuredLogResult>;
}

/// Runs an ordered list of parsers, returning the first non-`None` result.
pub struct MultiParser {
    parsers: Vec<Box<dyn StructuredLogParser>>,
}

impl MultiParser {
    pub fn new(parsers: Vec<Box<dyn StructuredLogParser>>) -> Self {
        Self { parsers }
    }
}

impl StructuredLogParser for MultiParser {
    fn try_parse(&self, message: &str) -> Option<StructuredLogResult> {
        for parser in &self.parsers {
            if let Some(result) = parser.try_parse(message) {
                return Some(result);
            }
        }
        None
    }
}
