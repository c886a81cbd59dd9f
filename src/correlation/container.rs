//! ContainerID discovery.
//!
//! Scans for `CreateContainer within sandbox "S" for
//! &ContainerMetadata{Name:N, ...} returns container id "C"` and extracts
//! `(S, N, C)`.

use once_cell::sync::Lazy;
use regex::Regex;

/// What a discovered container-creation log line resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerIdentity {
    pub sandbox_id: String,
    pub name: String,
    pub container_id: String,
}

static CREATE_CONTAINER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"CreateContainer within sandbox "(?P<sandbox>[^"]+)" for &ContainerMetadata\{Name:(?P<name>[^,}]+).*?\} returns container id "(?P<id>[^"]+)""#,
    )
    .expect("valid regex")
});

/// Attempts to parse `message` as a `CreateContainer` completion log.
pub fn discover_container(message: &str) -> Option<ContainerIdentity> {
    let caps = CREATE_CONTAINER.captures(message)?;
    Some(ContainerIdentity {
        sandbox_id: caps["sandbox"].to_string(),
        name: caps["name"].to_string(),
        container_id: caps["id"].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_parses_create_container_line() {
        let msg = r#"CreateContainer within sandbox "6123bdf1" for &ContainerMetadata{Name:fluentbit-gke-init,} returns container id "fc3e0256""#;
        let identity = discover_container(msg).unwrap();
        assert_eq!(identity.sandbox_id, "6123bdf1");
        assert_eq!(identity.name, "fluentbit-gke-init");
        assert_eq!(identity.container_id, "fc3e0256");
    }

    #[test]
    fn unrelated_message_is_none() {
        assert!(discover_container("some other log line").is_none());
    }
}
