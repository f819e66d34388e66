use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Subscriber for `config`. `RUST_LOG` wins over the configured level.
pub fn build_subscriber(config: &LoggingConfig) -> Box<dyn Subscriber + Send + Sync> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Compact => Box::new(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .compact(),
            ),
        ),
        LogFormat::Json => Box::new(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .json()
                    .with_current_span(true),
            ),
        ),
    }
}

/// Install the global subscriber
pub fn init_logger(config: &LoggingConfig) {
    build_subscriber(config).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_formats_accept_events_inside_spans() {
        for format in [LogFormat::Compact, LogFormat::Json] {
            let config = LoggingConfig {
                format,
                ..LoggingConfig::default()
            };

            tracing::subscriber::with_default(build_subscriber(&config), || {
                let span = tracing::info_span!("request", caller = 7);
                let _entered = span.enter();
                tracing::info!(acc_id = 7, "transaction applied");
            });
        }
    }
}
