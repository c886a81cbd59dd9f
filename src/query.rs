//! Pure query-generator functions: given parsed task inputs,
//! produce a backend filter string. No I/O, no task context: these are
//! plain functions so [`crate::stages::list_log`] can call them directly
//! and [`crate::task::RunMode::DryRun`] can record their output without
//! running anything expensive.

use chrono::{DateTime, Utc};

use crate::setfilter::ParsedSetFilter;

/// The `httplog.go`-exclusion fragment is recorded as configurable query
/// text rather than baked into every generator.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub httplog_exclusion_filter: Option<String>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            httplog_exclusion_filter: Some(
                r#"NOT protoPayload.methodName:"storage.googleapis.com""#.to_string(),
            ),
        }
    }
}

fn and_clauses(clauses: impl IntoIterator<Item = Option<String>>) -> String {
    clauses.into_iter().flatten().collect::<Vec<_>>().join(" AND ")
}

fn set_filter_clause(field: &str, filter: &ParsedSetFilter) -> Option<String> {
    if filter.additives.is_empty() && filter.subtractives.is_empty() {
        return None;
    }
    let mut parts = Vec::new();
    if !filter.additives.is_empty() {
        let values = filter.additives.iter().map(|v| format!("\"{v}\"")).collect::<Vec<_>>().join(" OR ");
        parts.push(format!("{field}:({values})"));
    }
    for sub in &filter.subtractives {
        parts.push(format!("NOT {field}:\"{sub}\""));
    }
    Some(format!("({})", parts.join(" AND ")))
}

/// Generates the filter for the Kubernetes control-plane audit log source.
pub fn generate_audit_query(
    resource_name: &str,
    namespaces: &ParsedSetFilter,
    options: &QueryOptions,
) -> String {
    and_clauses([
        Some(format!("resource.type=\"{resource_name}\"")),
        Some("logName:\"logs/cloudaudit.googleapis.com\"".to_string()),
        set_filter_clause("resource.labels.namespace_name", namespaces),
        options.httplog_exclusion_filter.clone(),
    ])
}

/// Generates the filter for container/kubelet/node-component logs, scoped
/// by namespace, component, and pod-name set-filters.
pub fn generate_container_query(
    namespaces: &ParsedSetFilter,
    components: &ParsedSetFilter,
    pod_names: &ParsedSetFilter,
) -> String {
    and_clauses([
        Some("resource.type=\"k8s_container\"".to_string()),
        set_filter_clause("resource.labels.namespace_name", namespaces),
        set_filter_clause("resource.labels.container_name", components),
        set_filter_clause("resource.labels.pod_name", pod_names),
    ])
}

/// Generates the filter for serial-port console logs.
pub fn generate_serial_port_query(response_flags: &ParsedSetFilter) -> String {
    and_clauses([
        Some("resource.type=\"gce_instance\"".to_string()),
        Some(r#"logName:"logs/serialconsole.googleapis.com""#.to_string()),
        set_filter_clause("jsonPayload.responseFlags", response_flags),
    ])
}

/// Appends an RFC3339 time-window clause, as every generator's caller does
/// at the stage boundary rather than inside each generator (keeps the
/// generators themselves pure functions of filter state).
pub fn with_time_window(filter: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "{filter} AND timestamp>=\"{}\" AND timestamp<\"{}\"",
        start.to_rfc3339(),
        end.to_rfc3339()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn filter(additives: &[&str]) -> ParsedSetFilter {
        ParsedSetFilter {
            additives: additives.iter().map(|s| s.to_string()).collect(),
            subtractives: vec![],
            subtract_mode: false,
            validation_error: None,
        }
    }

    #[test]
    fn container_query_includes_all_three_filters() {
        let q = generate_container_query(&filter(&["kube-system"]), &filter(&["kubelet"]), &filter(&[]));
        assert!(q.contains("namespace_name"));
        assert!(q.contains("container_name"));
        assert!(!q.contains("pod_name"));
    }

    #[test]
    fn audit_query_carries_httplog_exclusion_by_default() {
        let q = generate_audit_query("k8s_cluster", &filter(&[]), &QueryOptions::default());
        assert!(q.contains("storage.googleapis.com"));
    }

    #[test]
    fn httplog_exclusion_is_configurable_off() {
        let options = QueryOptions { httplog_exclusion_filter: None };
        let q = generate_audit_query("k8s_cluster", &filter(&[]), &options);
        assert!(!q.contains("storage.googleapis.com"));
    }

    #[test]
    fn time_window_is_appended() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let q = with_time_window("resource.type=\"x\"", start, end);
        assert!(q.contains("timestamp>="));
        assert!(q.contains("timestamp<"));
    }
}
