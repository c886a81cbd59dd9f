use super::{FIELD_MSG, FIELD_SEVERITY};
use super::{StructuredLogParser, StructuredLogResult};

/// Parses `key=value` logfmt lines. Values are quoted (escape-aware) or
/// unquoted-to-whitespace; escapes outside quotes are literal (a bare `\`
/// in an unquoted value is kept as-is, it does not start an escape).
pub struct LogfmtParser;

const SEVERITY_FIELDS: [&str; 2] = ["level", "severity"];

impl StructuredLogParser for LogfmtParser {
    fn try_parse(&self, message: &str) -> Option<StructuredLogResult> {
        let chars: Vec<char> = message.chars().collect();
        let mut result = StructuredLogResult::with_original(message);
        let mut i = 0;
        let mut found_any = false;

        while i < chars.len() {
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
                // Token without '=': skip it and keep scanning, matching the
                // grammar's tolerance for stray words.
                continue;
            }
            let key: String = chars[key_start..i].iter().collect();
            i += 1; // consume '='

            let (value, next) = read_value(&chars, i);
            i = next;

            if key.eq_ignore_ascii_case("msg") {
                result.set(FIELD_MSG, value.clone());
            }
            if SEVERITY_FIELDS.iter().any(|f| key.eq_ignore_ascii_case(f)) {
                if let Some(severity) = map_severity(&value) {
                    result.set(FIELD_SEVERITY, severity);
                }
            }
            result.set(&key, value);
            found_any = true;
        }

        if !found_any {
            return None;
        }
        Some(result)
    }
}

fn read_value(chars: &[char], start: usize) -> (String, usize) {
    if start < chars.len() && chars[start] == '"' {
        let mut out = String::new();
        let mut i = start + 1;
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
    } else {
        let mut i = start;
        while i < chars.len() && !chars[i].is_whitespace() {
            i += 1;
        }
        (chars[start..i].iter().collect(), i)
    }
}

fn map_severity(raw: &str) -> Option<&'static str> {
    match raw.to_lowercase().as_str() {
        "info" => Some("Info"),
        "warn" | "warning" => Some("Warning"),
        "err" | "error" => Some("Error"),
        "fatal" | "panic" => Some("Fatal"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s3_logfmt_with_escapes() {
        let parser = LogfmtParser;
        let input = r#"msg="Main \"message\"" fieldWithoutQuotes=3.1415 level=error"#;
        let result = parser.try_parse(input).unwrap();
        assert_eq!(result.msg(), Some(r#"Main "message""#));
        assert_eq!(result.get("fieldWithoutQuotes"), Some("3.1415"));
        assert_eq!(result.get("level"), Some("error"));
        assert_eq!(result.get("@severity"), Some("Error"));
    }

    #[test]
    fn roundtrip_preserves_original() {
        let parser = LogfmtParser;
        let input = "a=1 b=2";
        let result = parser.try_parse(input).unwrap();
        assert_eq!(result.get("@original"), Some(input));
    }

    #[test]
    fn no_key_value_pairs_returns_none() {
        let parser = LogfmtParser;
        assert!(parser.try_parse("just some plain text").is_none());
    }

    #[test]
    fn severity_field_names_are_case_insensitive() {
        let parser = LogfmtParser;
        let result = parser.try_parse("SEVERITY=WARN msg=hi").unwrap();
        assert_eq!(result.get("@severity"), Some("Warning"));
    }
}
