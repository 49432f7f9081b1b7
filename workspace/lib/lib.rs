//! Setup shared by the experiment binaries.

use std::path::Path;
use anyhow::Context;
use spinor_sim::config::ExperimentConfig;
use tracing::info;
use tracing_subscriber::{ filter::LevelFilter, EnvFilter };

/// Pick the filter directives: `RUST_LOG` wins when set and non-empty,
/// otherwise `level` (`trace`, `debug`, `info`, `warn`, `error`), falling
/// back to `info` for anything else.
pub fn filter_directives(level: &str, rust_log: Option<&str>) -> String {
    match rust_log.map(str::trim) {
        Some(directives) if !directives.is_empty() => directives.to_string(),
        _ => level.parse::<LevelFilter>()
            .unwrap_or(LevelFilter::INFO)
            .to_string()
            .to_lowercase(),
    }
}

/// Install a formatting subscriber filtered by `RUST_LOG`, or by `level` if
/// the variable is unset.
pub fn init_logging(level: &str) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directives = filter_directives(level, rust_log.as_deref());
    let filter
        = EnvFilter::try_new(&directives)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

/// Load the configuration at `path`, or the defaults if no path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ExperimentConfig> {
    match path {
        Some(path) => {
            info!("loading configuration from {}", path.display());
            ExperimentConfig::from_json(path)
                .with_context(|| format!("loading {}", path.display()))
        },
        None => Ok(ExperimentConfig::default()),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn env_directives_take_precedence() {
        assert_eq!(filter_directives("debug", None), "debug");
        assert_eq!(filter_directives("loud", None), "info");
        assert_eq!(filter_directives("warn", Some("  ")), "warn");
        assert_eq!(
            filter_directives("warn", Some("spinor_sim=trace")),
            "spinor_sim=trace",
        );
    }
}
