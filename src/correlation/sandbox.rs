//! PodSandboxID discovery.
//!
//! Scans filtered containerd logs for `RunPodSandbox for
//! &PodSandboxMetadata{Name:X, ... Namespace:Y, ...} returns sandbox id "Z"`
//! and extracts `(Y, X, Z)`.

use once_cell::sync::Lazy;
use regex::Regex;

/// What a discovered sandbox-creation log line resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodSandboxIdInfo {
    pub namespace: String,
    pub name: String,
    pub sandbox_id: String,
}

static RUN_POD_SANDBOX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"RunPodSandbox for &PodSandboxMetadata\{Name:(?P<name>[^,]+),.*?Namespace:(?P<namespace>[^,]+),.*?\} returns sandbox id "(?P<id>[^"]+)""#,
    )
    .expect("valid regex")
});

/// Attempts to parse `message` as a `RunPodSandbox` completion log.
/// Returns `None` on anything that doesn't match: a malformed or
/// unrelated containerd line is never an error.
pub fn discover_pod_sandbox(message: &str) -> Option<PodSandboxIdInfo> {
    let caps = RUN_POD_SANDBOX.captures(message)?;
    Some(PodSandboxIdInfo {
        namespace: caps["namespace"].to_string(),
        name: caps["name"].to_string(),
        sandbox_id: caps["id"].to_string(),
    })
}
