//! Task-input surface.
//!
//! A default-resolution layering (default, then override, then validate,
//! then convert to the typed form a stage actually consumes) generalized
//! to arbitrary input kinds keyed by a task reference ID instead of one
//! fixed struct.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{KhiError, KhiResult};
use crate::setfilter::{self, AllowFlags, ParsedSetFilter};

/// An inclusive-start, exclusive-end time range a query is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The identity of the project/cluster being inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterIdentity {
    pub project_id: String,
    pub cluster_name: String,
}

/// One named input kind's raw string value plus its resolution pipeline:
/// a default, a validator, and a string-to-typed converter. `options`
/// optionally enumerates known values for a UI/autocomplete surface; the
/// pipeline core itself never calls it.
pub struct TaskInputSpec<T> {
    pub default: Box<dyn Fn() -> T + Send + Sync>,
    pub validate: Box<dyn Fn(&str) -> KhiResult<()> + Send + Sync>,
    pub convert: Box<dyn Fn(&str) -> KhiResult<T> + Send + Sync>,
    pub options: Option<Box<dyn Fn() -> Vec<String> + Send + Sync>>,
}

impl<T> TaskInputSpec<T> {
    /// Resolves `raw` (or the default if `raw` is `None`) through
    /// validation and conversion.
    pub fn resolve(&self, raw: Option<&str>) -> KhiResult<T> {
        match raw {
            Some(value) => {
                (self.validate)(value)?;
                (self.convert)(value)
            }
            None => Ok((self.default)()),
        }
    }
}

fn set_filter_spec(aliases: HashMap<String, Vec<String>>, allow: AllowFlags) -> TaskInputSpec<ParsedSetFilter> {
    TaskInputSpec {
        default: Box::new(|| ParsedSetFilter::default()),
        validate: Box::new(|_raw| Ok(())),
        convert: Box::new(move |raw| {
            let parsed = setfilter::parse(raw, &aliases, allow);
            match &parsed.validation_error {
                Some(msg) => Err(KhiError::InvalidInput(msg.clone())),
                None => Ok(parsed),
            }
        }),
        options: None,
    }
}

/// Builds the namespace set-filter input kind.
pub fn namespace_set_filter_spec() -> TaskInputSpec<ParsedSetFilter> {
    let allow = AllowFlags { allow_add_all: true, allow_remove_all: false, allow_custom_value: true };
    set_filter_spec(HashMap::new(), allow)
}

/// Builds the component/pod-name set-filter input kinds.
pub fn component_set_filter_spec() -> TaskInputSpec<ParsedSetFilter> {
    let allow = AllowFlags { allow_add_all: true, allow_remove_all: true, allow_custom_value: true };
    set_filter_spec(HashMap::new(), allow)
}

/// Builds the response-flag set-filter input kind.
pub fn response_flag_set_filter_spec() -> TaskInputSpec<ParsedSetFilter> {
    let allow = AllowFlags { allow_add_all: true, allow_remove_all: true, allow_custom_value: false };
    set_filter_spec(HashMap::new(), allow)
}

/// A resolved bundle of task inputs, keyed by input-task reference ID
/// string.
#[derive(Default)]
pub struct TaskInputs {
    time_window: Option<TimeWindow>,
    cluster_identity: Option<ClusterIdentity>,
    namespaces: Option<ParsedSetFilter>,
    components: Option<ParsedSetFilter>,
    pod_names: Option<ParsedSetFilter>,
    response_flags: Option<ParsedSetFilter>,
}

impl TaskInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_window(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    pub fn with_cluster_identity(mut self, identity: ClusterIdentity) -> Self {
        self.cluster_identity = Some(identity);
        self
    }

    pub fn with_namespaces(mut self, filter: ParsedSetFilter) -> Self {
        self.namespaces = Some(filter);
        self
    }

    pub fn with_components(mut self, filter: ParsedSetFilter) -> Self {
        self.components = Some(filter);
        self
    }

    pub fn with_pod_names(mut self, filter: ParsedSetFilter) -> Self {
        self.pod_names = Some(filter);
        self
    }

    pub fn with_response_flags(mut self, filter: ParsedSetFilter) -> Self {
        self.response_flags = Some(filter);
        self
    }

    pub fn time_window(&self) -> KhiResult<TimeWindow> {
        self.time_window.ok_or_else(|| KhiError::InvalidInput("missing time window".into()))
    }

    pub fn cluster_identity(&self) -> KhiResult<&ClusterIdentity> {
        self.cluster_identity
            .as_ref()
            .ok_or_else(|| KhiError::InvalidInput("missing cluster identity".into()))
    }

    pub fn namespaces(&self) -> ParsedSetFilter {
        self.namespaces.clone().unwrap_or_default()
    }

    pub fn components(&self) -> ParsedSetFilter {
        self.components.clone().unwrap_or_default()
    }

    pub fn pod_names(&self) -> ParsedSetFilter {
        self.pod_names.clone().unwrap_or_default()
    }

    pub fn response_flags(&self) -> ParsedSetFilter {
        self.response_flags.clone().unwrap_or_default()
    }
}
