use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Maps a `-v` repeat count to a `tracing` level.
pub fn get_log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global `tracing` subscriber. `RUST_LOG` overrides `verbosity`
/// when set.
pub fn init(verbosity: u8) -> Result<()> {
    let default_directive = get_log_level(verbosity).to_string();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
        .context("logging initialization")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_increasing_levels() {
        assert_eq!(get_log_level(0), Level::WARN);
        assert_eq!(get_log_level(1), Level::INFO);
        assert_eq!(get_log_level(2), Level::DEBUG);
        assert_eq!(get_log_level(5), Level::TRACE);
    }
}
