use once_cell::sync::Lazy;
use regex::Regex;

use super::{FIELD_DATE, FIELD_MSG, FIELD_SOURCE, FIELD_THREAD_ID, FIELD_TIME};
use super::{StructuredLogParser, StructuredLogResult};

/// `[IWEF]MMDD HH:MM:SS.uuuuuu TID SRC:LINE] <body>`
static KLOG_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([IWEF])(\d{4}) (\d{2}:\d{2}:\d{2}\.\d+)\s+(\d+)\s+(\S+)\]\s?(.*)$").unwrap()
});

/// Parses glog/klog-formatted lines: an optional severity/timestamp header
/// followed by a quoted main message and `key=value` fields.
///
/// Parser instances are cheap and stateless; [`super::ParserPool`] exists
/// only to amortize the body-parser scratch buffer under heavy concurrent
/// use, not because this parser holds any mutable state itself.
pub struct KlogParser {
    has_header: bool,
}

impl KlogParser {
    pub fn with_header(has_header: bool) -> Self {
        Self { has_header }
    }
}

impl StructuredLogParser for KlogParser {
    fn try_parse(&self, message: &str) -> Option<StructuredLogResult> {
        let mut result = StructuredLogResult::with_original(message);

        let body = if self.has_header {
            let captures = KLOG_HEADER.captures(message)?;
            let severity = match &captures[1] {
                "I" => "Info",
                "W" => "Warning",
                "E" => "Error",
                "F" => "Fatal",
                _ => return None,
            };
            result.set(super::FIELD_SEVERITY, severity);
            result.set(FIELD_DATE, &captures[2]);
            result.set(FIELD_TIME, &captures[3]);
            result.set(FIELD_THREAD_ID, &captures[4]);
            result.set(FIELD_SOURCE, &captures[5]);
            captures[6].to_string()
        } else {
            message.to_string()
        };

        parse_body(&body, &mut result);
        Some(result)
    }
}

/// Body grammar: whitespace, then a quoted main message, then alternating
/// `key=value` pairs. A body that does not start with `"` is tolerated by
/// storing the whole thing as `@msg` with no further fields: an escape
/// hatch for controller-manager payloads that don't follow the
/// quoted-message convention.
fn parse_body(body: &str, result: &mut StructuredLogResult) {
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }

    if i >= chars.len() || chars[i] != '"' {
        result.set(FIELD_MSG, body.trim());
        return;
    }

    i += 1; // consume opening quote
    let (msg, next) = read_quoted(&chars, i);
    result.set(FIELD_MSG, msg);
    i = next;

    loop {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let key_start = i;
        while i < chars.len() && chars[i] != '=' && !chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() || chars[i] != '=' {
            // Malformed trailing token with no '=': tolerate by stopping.
            break;
        }
        let key: String = chars[key_start..i].iter().collect();
        i += 1; // consume '='

        if i >= chars.len() {
            result.set(&key, "");
            break;
        }

        let (value, next) = read_value(&chars, i);
        result.set(&key, value);
        i = next;
    }
}

/// Reads a `"`-delimited value starting just after the opening quote,
/// honoring backslash escapes, and returns the unescaped content plus the
/// index just past the closing quote (or end of input if unterminated).
fn read_quoted(chars: &[char], start: usize) -> (String, usize) {
    let mut out = String::new();
    let mut i = start;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                out.push(chars[i + 1]);
                i += 2;
            }
            '"' => {
                i += 1;
                break;
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    (out, i)
}

/// Reads a single field value. The opening rune decides the delimiter:
/// `"..."` is escape-aware and yields the unquoted content; `[...]` and
/// `{...}` are included verbatim including their delimiters; `&{...}` is
/// treated the same as `{...}` with the leading `&` dropped; anything else
/// runs to the next whitespace.
fn read_value(chars: &[char], start: usize) -> (String, usize) {
    match chars[start] {
        '"' => read_quoted(chars, start + 1),
        '[' => read_delimited(chars, start, '[', ']', true),
        '{' => read_delimited(chars, start, '{', '}', true),
        '&' if chars.get(start + 1) == Some(&'{') => {
            let (value, next) = read_delimited(chars, start + 1, '{', '}', true);
            (value, next)
        }
        _ => {
            let mut i = start;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            (chars[start..i].iter().collect(), i)
        }
    }
}

/// Reads a balanced `open`/`close` delimited span (supporting nesting),
/// returning the span including its delimiters when `include_delimiters` is
/// true.
fn read_delimited(chars: &[char], start: usize, open: char, close: char, include_delimiters: bool) -> (String, usize) {
    let mut depth = 0usize;
    let mut i = start;
    let content_start = if include_delimiters { start } else { start + 1 };
    while i < chars.len() {
        if chars[i] == open {
            depth += 1;
        } else if chars[i] == close {
            depth -= 1;
            if depth == 0 {
                let end = if include_delimiters { i + 1 } else { i };
                return (chars[content_start..end].iter().collect(), i + 1);
            }
        }
        i += 1;
    }
    // Unterminated: take everything that's left, tolerant of truncation.
    (chars[content_start..].iter().collect(), chars.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s2_klog_body_with_struct_field() {
        let parser = KlogParser::with_header(true);
        let input = r#"I0930 00:01:02.500000 1992 prober.go:116] "SyncLoop (PLEG): event for pod" pod="kube-system/fluentbit-gke-bfkqc" event=&{ID:0043b37a Type:ContainerStarted Data:abc}"#;
        let result = parser.try_parse(input).unwrap();
        assert_eq!(result.get("@severity"), Some("Info"));
        assert_eq!(result.get("@date"), Some("0930"));
        assert_eq!(result.get("@time"), Some("00:01:02.500000"));
        assert_eq!(result.get("@threadid"), Some("1992"));
        assert_eq!(result.get("@source"), Some("prober.go:116"));
        assert_eq!(result.msg(), Some("SyncLoop (PLEG): event for pod"));
        assert_eq!(result.get("pod"), Some("kube-system/fluentbit-gke-bfkqc"));
        assert_eq!(result.get("event"), Some("{ID:0043b37a Type:ContainerStarted Data:abc}"));
    }

    #[test]
    fn body_without_leading_quote_is_tolerated() {
        let parser = KlogParser::with_header(false);
        let result = parser.try_parse("plain controller-manager text, no quotes").unwrap();
        assert_eq!(result.msg(), Some("plain controller-manager text, no quotes"));
        assert_eq!(result.fields.len(), 2); // @original + @msg
    }

    #[test]
    fn header_missing_returns_none_when_header_expected() {
        let parser = KlogParser::with_header(true);
        assert!(parser.try_parse("not a header at all").is_none());
    }

    #[test]
    fn bracket_value_includes_brackets() {
        let parser = KlogParser::with_header(false);
        let result = parser.try_parse(r#""msg" items=[a b c] rest=done"#).unwrap();
        assert_eq!(result.get("items"), Some("[a b c]"));
        assert_eq!(result.get("rest"), Some("done"));
    }
}
