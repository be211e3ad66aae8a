//! Log setup for the CLI

use qakit_common::EnvironmentConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Filter directive: `--verbose` wins over the configured level
pub fn log_directive(verbose: bool, config: &EnvironmentConfig) -> &str {
    if verbose {
        "debug"
    } else {
        config.log_level.as_str()
    }
}

/// Install the stderr subscriber. `RUST_LOG` beats both flag and config.
pub fn init(verbose: bool, config: &EnvironmentConfig) {
    let directive = log_directive(verbose, config);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    debug!("Logging at '{}' for environment '{}'", directive, config.name);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_configured_level() {
        let config = EnvironmentConfig {
            log_level: "warn".to_string(),
            ..Default::default()
        };
        assert_eq!(log_directive(false, &config), "warn");
        assert_eq!(log_directive(true, &config), "debug");
    }
}
