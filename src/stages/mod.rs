//! The canonical stage set: `ListLogEntries → FieldSetRead →
//! LogFilter → Ingest/Group → LogToTimelineMapper → Tail`. Each builder
//! produces a [`crate::task::Task`] closed over its declared inputs.

pub mod fieldset_read;
pub mod filter;
pub mod group;
pub mod ingest;
pub mod list_log;
pub mod mapper;
pub mod tail;

pub use fieldset_read::build_fieldset_read;
pub use filter::build_filter;
pub use group::{build_grouper, GroupPolicy, LogGroupMap};
pub use ingest::build_ingester;
pub use list_log::build_list_log;
pub use mapper::build_timeline_mapper;
pub use tail::build_tail;

/// Default number of time-window partitions `ListLogEntries` splits a
/// query into.
pub const DEFAULT_LIST_LOG_PARTITIONS: usize = 10;

/// The character limit `ListLogEntries` warns past.
pub const FILTER_CHARACTER_LIMIT: usize = 20_000;
