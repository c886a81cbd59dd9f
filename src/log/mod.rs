//! The Log model: an immutable structured document with typed,
//! path-addressed reads and a lazily-populated FieldSet table.

pub mod fieldset;
pub mod node;

pub use fieldset::{FieldSet, FieldSetReader};
pub use node::{Node, NodeReader, Scalar};

use crate::error::KhiResult;
use crate::typed_map::TypedKeyMap;

/// Stable identifier for a [`Log`] within a single inspection run.
pub type LogId = u64;

/// Immutable structured document plus a per-log table of reader-computed
/// annotations. A `Log` never mutates its own node tree after construction;
/// only the FieldSet table grows, and only through [`Log::field_set`].
pub struct Log {
    id: LogId,
    root: Node,
    field_sets: TypedKeyMap,
}

impl Log {
    pub fn new(id: LogId, root: Node) -> Self {
        Self {
            id,
            root,
            field_sets: TypedKeyMap::new(),
        }
    }

    pub fn id(&self) -> LogId {
        self.id
    }

    pub fn node_reader(&self) -> NodeReader<'_> {
        NodeReader::new(&self.root)
    }

    /// Returns the FieldSet for `reader`'s kind, computing it at most once.
    /// A failed computation is not cached: a reader failure degrades to a
    /// retryable warning, never permanently poisoning the slot.
    pub fn field_set(&self, reader: &dyn FieldSetReader) -> KhiResult<FieldSet> {
        let node = self.node_reader();
        self.field_sets
            .get_or_try_set_with(reader.kind(), || reader.read(&node))
    }
}
