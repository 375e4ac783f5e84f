//! Tracing subscriber setup for hosts embedding the engine.

use tracing_subscriber::EnvFilter;

use dungeon_core::config::GeneralConfig;

/// Build the log filter: `RUST_LOG` when set and valid, otherwise
/// `config.log_level`, otherwise `info`.
#[must_use]
pub fn env_filter(config: &GeneralConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global `tracing` subscriber.
///
/// Returns `false` if a subscriber was already installed, which leaves the
/// existing one in place.
pub fn init(config: &GeneralConfig) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(config));
    let installed = if config.json_logs {
        builder.json().try_init()
    } else {
        builder.with_target(false).try_init()
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_level_falls_back_to_info() {
        let config = GeneralConfig {
            log_level: "not a [level".into(),
            json_logs: false,
        };
        // RUST_LOG may be set by the harness; either way a filter is built.
        let filter = env_filter(&config);
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn second_init_is_refused() {
        let config = GeneralConfig::default();
        init(&config);
        assert!(!init(&config));
    }
}
