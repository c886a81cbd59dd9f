use super::{StructuredLogParser, StructuredLogResult};

const FIELD_STREAM: &str = "@stream";
const FIELD_PARTIAL: &str = "@partial";

/// Parses CRI/containerd log-file lines of the form
/// `<rfc3339-timestamp> <stream> <tag> <message>`, where `stream` is
/// `stdout`/`stderr` and `tag` is `F` (full line) or `P` (partial, more of
/// this line follows in the next record). This is the on-disk format
/// containerd writes for every container, independent of whatever the
/// container itself logs into that line (which is then re-parsed by klog,
/// logfmt, or raw fallback).
pub struct ContainerdParser;

impl StructuredLogParser for ContainerdParser {
    fn try_parse(&self, message: &str) -> Option<StructuredLogResult> {
        let mut parts = message.splitn(4, ' ');
        let timestamp = parts.next()?;
        let stream = parts.next()?;
        let tag = parts.next()?;
        let rest = parts.next().unwrap_or("");

        if !timestamp.contains('T') || (stream != "stdout" && stream != "stderr") {
            return None;
        }
        if tag != "F" && tag != "P" {
            return None;
        }

        let mut result = StructuredLogResult::with_original(message);
        result.set(super::FIELD_TIME, timestamp);
        result.set(FIELD_STREAM, stream);
        result.set(FIELD_PARTIAL, if tag == "P" { "true" } else { "false" });
        result.set(super::FIELD_MSG, rest);
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_line() {
        let parser = ContainerdParser;
        let input = "2024-01-01T00:00:00.123456789Z stdout F container said hello";
        let result = parser.try_parse(input).unwrap();
        assert_eq!(result.get("@stream"), Some("stdout"));
        assert_eq!(result.get("@partial"), Some("false"));
        assert_eq!(result.msg(), Some("container said hello"));
    }

    #[test]
    fn parses_partial_line() {
        let parser = ContainerdParser;
        let input = "2024-01-01T00:00:00Z stderr P truncated mid";
        let result = parser.try_parse(input).unwrap();
        assert_eq!(result.get("@partial"), Some("true"));
    }

    #[test]
    fn rejects_non_containerd_lines() {
        let parser = ContainerdParser;
        assert!(parser.try_parse("not a containerd line").is_none());
    }
}
