mod args;

pub use args::{parse_args, Args};

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::changeset::{ChangeSet, Revision, Verb};
use crate::client::{FixtureLogClient, LogClient};
use crate::config::Config;
use crate::correlation::CorrelationHit;
use crate::feature::{FeatureRegistration, FeatureTaskLabel};
use crate::history::HistoryBuilder;
use crate::input::{component_set_filter_spec, namespace_set_filter_spec};
use crate::log::fieldset::CommonReader;
use crate::pattern::{PatternFinder, TriePatternFinder};
use crate::setfilter::ParsedSetFilter;
use crate::stages::{
    build_fieldset_read, build_filter, build_grouper, build_list_log, build_tail, build_timeline_mapper,
    GroupPolicy,
};
use crate::task::{Executor, Plan, Registry, RunMode, TaskImplementationID};

/// Treats a blank CLI flag as "not provided" so its spec's default applies,
/// instead of running an empty string through validation (which rejects an
/// empty additive side).
fn resolve_set_filter(raw: &str, spec: crate::input::TaskInputSpec<ParsedSetFilter>) -> Result<ParsedSetFilter> {
    let raw = raw.trim();
    let resolved = if raw.is_empty() { spec.resolve(None) } else { spec.resolve(Some(raw)) };
    Ok(resolved?)
}

/// Wires one feature's `ListLogEntries -> FieldSetRead -> LogFilter -> Group
/// -> LogToTimelineMapper -> Tail` chain against `client`,
/// registers it under `registry`, and returns the feature's registration.
///
/// This is the demonstration binary's entire job: a real deployment would
/// register many such chains, one per log source, sharing the same
/// `HistoryBuilder`.
fn register_k8s_container_feature(
    registry: &mut Registry,
    client: Arc<dyn LogClient>,
    history: Arc<HistoryBuilder>,
    args: &Args,
    config: &Config,
) -> Result<FeatureRegistration> {
    let now = Utc::now();
    let (start, end) = args.time_window(now)?;
    let namespaces = resolve_set_filter(&args.namespaces, namespace_set_filter_spec())?;
    let components = resolve_set_filter(&args.components, component_set_filter_spec())?;
    let pod_names = resolve_set_filter(&args.pod_names, component_set_filter_spec())?;

    let filter = crate::query::with_time_window(
        &crate::query::generate_container_query(&namespaces, &components, &pod_names),
        start,
        end,
    );

    let list_log = build_list_log(
        TaskImplementationID::new("k8s_container/list_log"),
        client,
        args.resources.clone(),
        filter,
        start,
        end,
        args.partitions.unwrap_or(config.list_log.time_window_partitions),
    );
    let list_log_ref = list_log.reference();
    registry.register(Arc::new(list_log))?;

    let fieldset_read = build_fieldset_read(
        TaskImplementationID::new("k8s_container/fieldset_read"),
        list_log_ref,
        Arc::new(CommonReader),
        config.worker_pool.fieldset_read_concurrency,
    );
    let fieldset_read_ref = fieldset_read.reference();
    registry.register(Arc::new(fieldset_read))?;

    let filtered = build_filter(
        TaskImplementationID::new("k8s_container/filter"),
        fieldset_read_ref,
        Arc::new(|_log: &crate::log::Log| true),
    );
    let filtered_ref = filtered.reference();
    registry.register(Arc::new(filtered))?;

    let grouped = build_grouper(
        TaskImplementationID::new("k8s_container/group"),
        filtered_ref,
        GroupPolicy::AllDependent,
        Arc::new(|_log| String::new()),
    );
    let grouped_ref = grouped.reference();
    registry.register(Arc::new(grouped))?;

    let correlation_finder: Arc<dyn PatternFinder<CorrelationHit>> = Arc::new(TriePatternFinder::new());

    let mapper = build_timeline_mapper::<u64>(
        TaskImplementationID::new("k8s_container/mapper"),
        grouped_ref,
        history,
        Arc::new(|| 0u64),
        Arc::new(move |state, log| {
            *state += 1;
            let mut cs = ChangeSet::new();
            let Ok(fs) = log.field_set(&CommonReader) else {
                return cs;
            };
            let Ok((timestamp,)) = fs.as_common() else {
                return cs;
            };

            let message = log.node_reader().get_str("textPayload").unwrap_or("");
            let node_name = log.node_reader().get_str("resource.labels.node_name").unwrap_or("unknown");
            let effects = crate::correlation::correlate(message, correlation_finder.as_ref(), node_name);

            if let Some(path) = &effects.node_containerd_path {
                cs.add_revision(
                    path.clone(),
                    Revision {
                        verb: Verb::Update,
                        state: "containerd".into(),
                        requestor: "containerd".into(),
                        change_time: *timestamp,
                        partial: false,
                    },
                );
                cs.add_event(path.clone(), *timestamp, message);
            }
            for pod_path in &effects.pod_paths {
                cs.add_event(pod_path.clone(), *timestamp, message);
            }
            for container_path in &effects.container_paths {
                cs.add_event(container_path.clone(), *timestamp, message);
            }
            for (id, human_name) in &effects.summary_replacements {
                cs.add_summary_replacement(id.clone(), human_name.clone());
            }
            cs.set_summary(message);

            let has_correlation_path =
                effects.node_containerd_path.is_some() || !effects.pod_paths.is_empty() || !effects.container_paths.is_empty();
            if !has_correlation_path {
                cs.add_revision(
                    format!("core/v1#pod#unknown#log-{}", log.id()),
                    Revision {
                        verb: Verb::Update,
                        state: "seen".into(),
                        requestor: "k8s_container".into(),
                        change_time: *timestamp,
                        partial: false,
                    },
                );
            }
            cs
        }),
    );
    let mapper_ref = mapper.reference();
    registry.register(Arc::new(mapper))?;

    let tail = build_tail(
        TaskImplementationID::new("k8s_container/tail"),
        vec![mapper_ref.untyped()],
        "k8s container logs mapped into history",
    );
    let tail_ref = tail.reference();
    registry.register(Arc::new(tail))?;

    let label = FeatureTaskLabel::new("k8s-container-logs", "Kubernetes container logs", "k8s_container")
        .with_priority(0)
        .with_inspection_types(["cluster"]);
    Ok(FeatureRegistration::new(label, &tail_ref))
}

/// A small, deterministic-in-shape fixture backend standing in for a real
/// Cloud Logging client, seeded with a container log line and a matching
/// containerd sandbox-creation line so the demonstration run exercises
/// [`crate::correlation::discover_pod_sandbox`] end-to-end.
fn sample_fixture_client() -> FixtureLogClient {
    let now = Utc::now();
    FixtureLogClient::new()
        .with_entry(
            now - chrono::Duration::minutes(5),
            crate::log::Node::map([
                ("metadata".to_string(), crate::log::Node::map([("timestamp".to_string(), crate::log::Node::str((now - chrono::Duration::minutes(5)).to_rfc3339()))])),
                (
                    "textPayload".to_string(),
                    crate::log::Node::str(
                        r#"RunPodSandbox for &PodSandboxMetadata{Name:web-7f9,Namespace:default,} returns sandbox id "a1b2c3""#,
                    ),
                ),
            ]),
        )
        .with_entry(
            now - chrono::Duration::minutes(2),
            crate::log::Node::map([(
                "metadata".to_string(),
                crate::log::Node::map([("timestamp".to_string(), crate::log::Node::str((now - chrono::Duration::minutes(2)).to_rfc3339()))]),
            )]),
        )
}

/// Runs the inspection pipeline against an in-memory fixture log backend and
/// prints a summary of the resulting history.
pub async fn run(args: Args) -> Result<()> {
    crate::logging::init(args.verbosity)?;
    let config = Config::load().unwrap_or_default();

    let client: Arc<dyn LogClient> = Arc::new(sample_fixture_client());
    let history = Arc::new(HistoryBuilder::new());

    let mut registry = Registry::new();
    let registration = register_k8s_container_feature(&mut registry, client, history.clone(), &args, &config)?;

    let plan = Plan::build(&registry, &[registration.tail.clone()])?;
    info!(tasks = plan.len(), feature = %registration.label.name, "plan built");

    let mode = if args.dry_run { RunMode::DryRun } else { RunMode::Run };
    let executor = Executor::new(args.concurrency.unwrap_or(config.worker_pool.task_concurrency));
    let report = executor.run(&registry, &plan, mode).await;

    for query in report.metadata.queries() {
        println!("query: {query}");
    }
    for message in report.metadata.messages() {
        println!("[{:?}] {}: {}", message.level, message.task_id, message.text);
    }

    if !report.is_success() {
        for failure in &report.failures {
            println!("failure: {failure}");
        }
    }

    let snapshot = history.snapshot();
    println!("resource paths observed: {}", snapshot.timelines.len());

    Ok(())
}
