//! Tracing setup for embedders that do not install their own subscriber.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{Config, LOG_ENV};

static INSTALLED: Once = Once::new();

/// Install a fmt subscriber and route panics through tracing (idempotent).
///
/// `MPVJS_LOG` takes a filter directive; without it the level is `debug` for
/// verbose configurations and `info` otherwise. A subscriber installed by the
/// embedder beforehand is left in place.
pub fn init(config: &Config) {
    INSTALLED.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));
        let _ = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .without_time()
            .with_target(false)
            .try_init();

        std::panic::set_hook(Box::new(tracing_panic::panic_hook));
    });
}

const fn default_directive(config: &Config) -> &'static str {
    if config.verbose { "debug" } else { "info" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_default_level() {
        let mut config = Config::default();
        assert_eq!(default_directive(&config), "info");
        config.verbose = true;
        assert_eq!(default_directive(&config), "debug");
    }

    #[test]
    fn init_twice_is_harmless() {
        init(&Config::default());
        init(&Config::default());
        tracing::info!("logging installed");
    }
}
