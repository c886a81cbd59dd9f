use super::FIELD_MSG;
use super::{StructuredLogParser, StructuredLogResult};

/// The parser of last resort: always succeeds, mapping `@original = @msg =
/// message`. Used as the tail entry of a [`super::MultiParser`] chain so no
/// log is ever dropped for lack of a matching grammar.
pub struct RawFallbackParser;

impl StructuredLogParser for RawFallbackParser {
    fn try_parse(&self, message: &str) -> Option<StructuredLogResult> {
        let mut result = StructuredLogResult::with_original(message);
        result.set(FIELD_MSG, message);
        Some(result)
    }
}
