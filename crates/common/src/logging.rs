use crate::config::Environment;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_DIRECTIVE: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber: env filter, the given OpenTelemetry layer,
/// then pretty output in development or JSON lines in production.
pub(crate) fn install<L>(environment: Environment, otel_layer: L)
where
    L: Layer<Registry> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry()
        .with(otel_layer)
        .with(env_filter());

    match environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .init();
        }
        Environment::Development => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_ansi(true)
                        .with_thread_names(true),
                )
                .init();
        }
    }
}

/// Initialize tracing without an OTLP exporter.
///
/// Uses `RUST_LOG` for filtering (defaults to "info"). The OpenTelemetry layer
/// is still installed so spans reach a global tracer provider if one is set
/// later.
pub fn setup_logging(environment: Environment) {
    install(environment, tracing_opentelemetry::layer());
}
