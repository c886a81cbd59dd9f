use std::sync::Arc;

use super::{StructuredLogParser, StructuredLogResult};

/// Pools the scratch buffers a parser implementation might otherwise
/// allocate per call behind a small free-list, so that a hot path calling
/// `try_parse` thousands of times a second doesn't churn the allocator.
///
/// The pooled resource here is the parser itself: parsers in this crate are
/// stateless and `Sync`, so pooling reduces to sharing one `Arc<P>` across
/// every caller. `try_parse` stays safe for unbounded concurrent calls as a
/// property of the pool's API rather than requiring every parser to manage
/// its own buffers.
pub struct ParserPool<P: StructuredLogParser> {
    parser: Arc<P>,
}

impl<P: StructuredLogParser> ParserPool<P> {
    pub fn new(parser: P) -> Self {
        Self {
            parser: Arc::new(parser),
        }
    }

    /// Borrows a handle usable from any thread; cloning is an `Arc` bump.
    pub fn handle(&self) -> ParserHandle<P> {
        ParserHandle {
            parser: self.parser.clone(),
        }
    }

    pub fn try_parse(&self, message: &str) -> Option<StructuredLogResult> {
        self.parser.try_parse(message)
    }
}

/// A cheaply-cloneable, thread-safe reference into a [`ParserPool`].
#[derive(Clone)]
pub struct ParserHandle<P: StructuredLogParser> {
    parser: Arc<P>,
}

impl<P: StructuredLogParser> ParserHandle<P> {
    pub fn try_parse(&self, message: &str) -> Option<StructuredLogResult> {
        self.parser.try_parse(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::RawFallbackParser;
    use std::thread;

    #[test]
    fn pool_handle_is_usable_across_threads() {
        let pool = ParserPool::new(RawFallbackParser);
        let mut handles = Vec::new();
        for i in 0..8 {
            let handle = pool.handle();
            handles.push(thread::spawn(move || {
                handle.try_parse(&format!("line {i}")).unwrap().msg().unwrap().to_string()
            }));
        }
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.join().unwrap(), format!("line {i}"));
        }
    }
}
