use chrono::{DateTime, Duration, Utc};
use clap::Parser;

/// Demonstration CLI for the inspection pipeline core. A polished
/// end-user CLI/UI is out of scope; this binary exists to exercise the
/// task graph end-to-end against a fixture log backend, not to be one.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Resource names to query (e.g. GKE cluster resource names). Ignored by
    /// the fixture log backend, forwarded to a real one.
    #[arg(long = "resource", value_name = "NAME")]
    pub resources: Vec<String>,

    /// Namespace set-filter expression (e.g. "+kube-system -default").
    #[arg(long, default_value = "")]
    pub namespaces: String,

    /// Component set-filter expression.
    #[arg(long, default_value = "")]
    pub components: String,

    /// Pod-name set-filter expression.
    #[arg(long = "pods", default_value = "")]
    pub pod_names: String,

    /// Response-flag set-filter expression (serial-port source).
    #[arg(long, default_value = "")]
    pub response_flags: String,

    /// How far back the time window starts, e.g. "1h", "30m", "2d".
    #[arg(long, default_value = "1h")]
    pub since: String,

    /// Number of time-window partitions `ListLogEntries` splits into.
    #[arg(long)]
    pub partitions: Option<usize>,

    /// Maximum number of tasks the executor runs concurrently.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Validate the plan and print the generated queries without fetching
    /// or mapping any logs.
    #[arg(long)]
    pub dry_run: bool,

    /// Verbosity level for internal logging (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

pub fn parse_args() -> Args {
    Args::parse()
}

impl Args {
    /// Parses `since` into a `(start, end)` window ending now. Accepts a
    /// bare integer (seconds) or a suffixed duration (`s`, `m`, `h`, `d`).
    pub fn time_window(&self, now: DateTime<Utc>) -> anyhow::Result<(DateTime<Utc>, DateTime<Utc>)> {
        let duration = parse_duration(&self.since)?;
        Ok((now - duration, now))
    }
}

fn parse_duration(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let (number, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => raw.split_at(idx),
        None => (raw, "s"),
    };
    let value: i64 = number.parse().map_err(|_| anyhow::anyhow!("invalid duration '{raw}'"))?;
    match unit {
        "s" | "" => Ok(Duration::seconds(value)),
        "m" => Ok(Duration::minutes(value)),
        "h" => Ok(Duration::hours(value)),
        "d" => Ok(Duration::days(value)),
        other => Err(anyhow::anyhow!("unknown duration unit '{other}' in '{raw}'")),
    }
}

impl Default for Args {
    fn default() -> Self {
        Self {
            resources: Vec::new(),
            namespaces: String::new(),
            components: String::new(),
            pod_names: String::new(),
            response_flags: String::new(),
            since: "1h".to_string(),
            partitions: None,
            concurrency: None,
            dry_run: false,
            verbosity: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hour_suffixed_duration() {
        assert_eq!(parse_duration("2h").unwrap(), Duration::hours(2));
    }

    #[test]
    fn parses_bare_seconds() {
        assert_eq!(parse_duration("45").unwrap(), Duration::seconds(45));
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_duration("5x").is_err());
    }
}
