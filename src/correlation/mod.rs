//! Correlation substrata: discovering opaque containerd IDs from log text
//! and rewriting them into semantic resource paths during mapping.

pub mod container;
pub mod sandbox;

pub use container::{discover_container, ContainerIdentity};
pub use sandbox::{discover_pod_sandbox, PodSandboxIdInfo};

use crate::pattern::{find_all_with_starter_runes, PatternFinder};

/// What a correlation hit on the main message text resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorrelationHit {
    Sandbox(PodSandboxIdInfo),
    Container(ContainerIdentity),
}

/// Scans `message` for any previously-discovered sandbox or container ID,
/// using `"` and `=` as the token-starter runes a correlation ID can follow.
pub fn scan_message(message: &str, finder: &dyn PatternFinder<CorrelationHit>) -> Vec<CorrelationHit> {
    find_all_with_starter_runes(message, finder, false, &['"', '='])
        .into_iter()
        .map(|m| m.value)
        .collect()
}

/// What a mapper should do with one log's message once correlation has run:
/// resource paths to attach an event to, and raw-ID-to-human-name
/// substitutions for the displayed summary.
#[derive(Debug, Clone, Default)]
pub struct CorrelationEffects {
    pub node_containerd_path: Option<String>,
    pub pod_paths: Vec<String>,
    pub container_paths: Vec<String>,
    pub summary_replacements: Vec<(String, String)>,
}

/// Registers any sandbox/container creation this message announces into
/// `finder`, then scans the message for correlation IDs registered by an
/// earlier call (on this or any other message) and reports the resource
/// paths and summary substitutions a mapper should apply.
///
/// A sandbox hit resolves straight to the pod's resource path. A container
/// hit additionally looks up its sandbox ID in `finder` to resolve the pod
/// identity the container belongs to before reporting the container path.
/// Re-registering an ID already known to `finder` is not an error.
pub fn correlate(message: &str, finder: &dyn PatternFinder<CorrelationHit>, node_name: &str) -> CorrelationEffects {
    let mut effects = CorrelationEffects::default();

    if let Some(info) = discover_pod_sandbox(message) {
        let sandbox_id = info.sandbox_id.clone();
        effects.node_containerd_path = Some(format!("core/v1#node#{node_name}#containerd"));
        let _ = finder.add_pattern(&sandbox_id, CorrelationHit::Sandbox(info));
    }

    if let Some(identity) = discover_container(message) {
        let container_id = identity.container_id.clone();
        effects.node_containerd_path = Some(format!("core/v1#node#{node_name}#containerd"));
        let _ = finder.add_pattern(&container_id, CorrelationHit::Container(identity));
    }

    for hit in scan_message(message, finder) {
        match hit {
            CorrelationHit::Sandbox(info) => {
                effects.pod_paths.push(format!("core/v1#pod#{}#{}", info.namespace, info.name));
                effects
                    .summary_replacements
                    .push((info.sandbox_id.clone(), format!("{}/{}", info.namespace, info.name)));
            }
            CorrelationHit::Container(identity) => {
                if let Ok(CorrelationHit::Sandbox(info)) = finder.get_pattern(&identity.sandbox_id) {
                    effects
                        .container_paths
                        .push(format!("core/v1#pod#{}#{}#{}", info.namespace, info.name, identity.name));
                    effects
                        .summary_replacements
                        .push((identity.container_id.clone(), identity.name.clone()));
                }
            }
        }
    }

    effects
}
