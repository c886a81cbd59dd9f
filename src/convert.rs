//! Special-sequence text converters.
//!
//! Each converter implements [`SpecialSequenceConverter`] and is pure:
//! `convert(s)` never depends on anything but `s`. A [`ConverterChain`]
//! composes converters in order, normalizing raw container/serial-port
//! text before display.

use once_cell::sync::Lazy;
use regex::Regex;

/// A single text-cleaning step.
pub trait SpecialSequenceConverter: Send + Sync {
    fn convert(&self, input: &str) -> String;
}

/// Runs a fixed, ordered list of converters. Order matters: e.g. stripping
/// ANSI escapes before unquoting unicode escapes avoids reinterpreting
/// control-sequence bytes as data.
pub struct ConverterChain {
    converters: Vec<Box<dyn SpecialSequenceConverter>>,
}

impl ConverterChain {
    pub fn new(converters: Vec<Box<dyn SpecialSequenceConverter>>) -> Self {
        Self { converters }
    }

    pub fn convert(&self, input: &str) -> String {
        let mut current = input.to_string();
        for converter in &self.converters {
            current = converter.convert(&current);
        }
        current
    }

    /// The converter pipeline the serial-port parser runs every payload
    /// through: strip ANSI styling, erase the CR/LF the console inserts
    /// between framebuffer writes, then decode any `\xNN` byte escapes.
    pub fn serial_port_chain() -> Self {
        Self::new(vec![
            Box::new(AnsiEscapeStripper),
            Box::new(LiteralSequenceEraser::new(vec!["\r".to_string(), "\n".to_string()])),
            Box::new(UnicodeUnquoter),
        ])
    }
}

/// Strips ANSI escape sequences of the form `ESC [ ... <letter>`, where
/// `ESC` may be written as the byte `\x1b`, the literal two characters
/// ``, or octal `\033`. A sequence that never reaches a terminating
/// letter before the text ends is left untouched, tolerating truncated
/// mid-stream output.
pub struct AnsiEscapeStripper;

impl SpecialSequenceConverter for AnsiEscapeStripper {
    fn convert(&self, input: &str) -> String {
        let chars: Vec<char> = input.chars().collect();
        let mut out = String::with_capacity(input.len());
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '\u{1b}' && i + 1 < chars.len() && chars[i + 1] == '[' {
                // Find the terminating letter (the standard CSI final byte
                // range is 0x40-0x7e, but any ASCII letter covers real logs).
                let mut j = i + 2;
                let mut terminated = false;
                while j < chars.len() {
                    if chars[j].is_ascii_alphabetic() {
                        terminated = true;
                        break;
                    }
                    j += 1;
                }
                if terminated {
                    i = j + 1;
                    continue;
                }
                // No terminator found: leave the (potentially partial)
                // escape sequence untouched rather than eating the rest.
                out.push(chars[i]);
                i += 1;
                continue;
            }
            out.push(chars[i]);
            i += 1;
        }
        out
    }
}

/// Replaces every occurrence of any literal sequence in `sequences` with
/// `replacement` (empty string by default).
pub struct LiteralSequenceEraser {
    sequences: Vec<String>,
    replacement: String,
}

impl LiteralSequenceEraser {
    pub fn new(sequences: Vec<String>) -> Self {
        Self {
            sequences,
            replacement: String::new(),
        }
    }

    pub fn with_replacement(sequences: Vec<String>, replacement: String) -> Self {
        Self {
            sequences,
            replacement,
        }
    }
}

impl SpecialSequenceConverter for LiteralSequenceEraser {
    fn convert(&self, input: &str) -> String {
        let mut current = input.to_string();
        for seq in &self.sequences {
            if seq.is_empty() {
                continue;
            }
            current = current.replace(seq.as_str(), &self.replacement);
        }
        current
    }
}

/// Applies a regex substitution.
pub struct RegexReplacer {
    pattern: Regex,
    replacement: String,
}

impl RegexReplacer {
    pub fn new(pattern: Regex, replacement: impl Into<String>) -> Self {
        Self {
            pattern,
            replacement: replacement.into(),
        }
    }
}

impl SpecialSequenceConverter for RegexReplacer {
    fn convert(&self, input: &str) -> String {
        self.pattern.replace_all(input, self.replacement.as_str()).into_owned()
    }
}

/// Strips a leading RFC3339-ish timestamp token (and the single whitespace
/// separating it from the rest of the line), used by the kubelet/serial-port
/// sources that prefix every line with a wall-clock timestamp before the
/// container's own output.
pub struct TimestampStripper;

static TIMESTAMP_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?\s").unwrap()
});

impl SpecialSequenceConverter for TimestampStripper {
    fn convert(&self, input: &str) -> String {
        TIMESTAMP_PREFIX.replace(input, "").into_owned()
    }
}

/// Decodes `\xNN` byte escapes (as emitted by some serial-port consoles for
/// non-ASCII bytes) by reassembling the raw byte stream and re-decoding it
/// as UTF-8, replacing anything that still isn't valid UTF-8.
pub struct UnicodeUnquoter;

impl SpecialSequenceConverter for UnicodeUnquoter {
    fn convert(&self, input: &str) -> String {
        let bytes = input.as_bytes();
        let mut decoded = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'\\'
                && i + 3 < bytes.len()
                && bytes[i + 1] == b'x'
                && bytes[i + 2].is_ascii_hexdigit()
                && bytes[i + 3].is_ascii_hexdigit()
            {
                let hex = std::str::from_utf8(&bytes[i + 2..i + 4]).unwrap();
                let byte = u8::from_str_radix(hex, 16).unwrap();
                decoded.push(byte);
                i += 4;
            } else {
                decoded.push(bytes[i]);
                i += 1;
            }
        }
        String::from_utf8_lossy(&decoded).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_stripper_removes_color_codes() {
        let stripper = AnsiEscapeStripper;
        assert_eq!(stripper.convert("\u{1b}[31mred\u{1b}[0m"), "red");
    }

    #[test]
    fn ansi_stripper_leaves_incomplete_sequence() {
        let stripper = AnsiEscapeStripper;
        assert_eq!(stripper.convert("abc\u{1b}[31"), "abc\u{1b}[31");
    }

    #[test]
    fn literal_eraser_default_replacement_is_empty() {
        let eraser = LiteralSequenceEraser::new(vec!["\r".to_string(), "\n".to_string()]);
        assert_eq!(eraser.convert("a\r\nb"), "ab");
    }

    #[test]
    fn unicode_unquoter_decodes_byte_escapes() {
        let unquoter = UnicodeUnquoter;
        // \xe2\x80\xa6 is the UTF-8 encoding of the ellipsis character.
        assert_eq!(unquoter.convert(r"\xe2\x80\xa6"), "\u{2026}");
    }

    #[test]
    fn s6_serial_port_chain_matches_scenario() {
        let chain = ConverterChain::serial_port_chain();
        let input = "\u{1b}[31mred\u{1b}[0m\r\nJob cri-containerd-06a622d26bbe9788\\xe2\\x80\\xa6/stop";
        let output = chain.convert(input);
        assert_eq!(output, "redJob cri-containerd-06a622d26bbe9788\u{2026}/stop");
    }
}
