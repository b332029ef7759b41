//! Logging setup.
//!
//! Logs go to stderr through `tracing-subscriber` so stdout stays clean for
//! command output. With the `otlp` feature, traces and logs are also
//! exported, but only when `telemetry.share_diagnostics` is on.

use anyhow::Result;
use momentconf::TelemetryConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Keeps exporters alive for the life of the process; flushes on drop.
#[derive(Default)]
pub struct TelemetryGuard {
    #[cfg(feature = "otlp")]
    providers: Option<otlp::Providers>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        #[cfg(feature = "otlp")]
        {
            if let Some(providers) = self.providers.take() {
                providers.shutdown();
            }
        }
    }
}

pub fn init(config: &TelemetryConfig) -> Result<TelemetryGuard> {
    if config.share_diagnostics {
        #[cfg(feature = "otlp")]
        {
            let providers = otlp::install(&config.otlp_endpoint, &config.log_level)?;
            tracing::info!(endpoint = %config.otlp_endpoint, "sharing diagnostics over OTLP");
            return Ok(TelemetryGuard {
                providers: Some(providers),
            });
        }
    }

    tracing_subscriber::registry()
        .with(env_filter(&config.log_level))
        .with(fmt_layer())
        .try_init()?;

    if config.share_diagnostics {
        tracing::warn!("diagnostics sharing is on but this build has no OTLP exporter");
    }

    Ok(TelemetryGuard::default())
}

/// Parse the configured level, falling back to `info` on a bad directive.
fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"))
}

fn fmt_layer<S>() -> impl Layer<S> + Send + Sync + 'static
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
}

#[cfg(feature = "otlp")]
mod otlp {
    use std::time::Duration;

    use anyhow::{Context, Result};
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::{global, KeyValue};
    use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::logs::SdkLoggerProvider;
    use opentelemetry_sdk::trace::{RandomIdGenerator, Sampler, SdkTracerProvider};
    use opentelemetry_sdk::Resource;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    /// Keeps exports from stalling the CLI when the collector is down.
    const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

    pub(super) struct Providers {
        tracer: SdkTracerProvider,
        logger: SdkLoggerProvider,
    }

    impl Providers {
        pub(super) fn shutdown(self) {
            if let Err(e) = self.tracer.shutdown() {
                eprintln!("trace exporter shutdown failed: {}", e);
            }
            if let Err(e) = self.logger.shutdown() {
                eprintln!("log exporter shutdown failed: {}", e);
            }
        }
    }

    pub(super) fn install(otlp_endpoint: &str, log_level: &str) -> Result<Providers> {
        let resource = Resource::builder_empty()
            .with_service_name("moments")
            .with_attributes(vec![KeyValue::new(
                "service.version",
                env!("CARGO_PKG_VERSION"),
            )])
            .build();

        let endpoint = format!("http://{}", otlp_endpoint);

        let span_exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint.clone())
            .with_timeout(EXPORT_TIMEOUT)
            .build()
            .context("Failed to create OTLP span exporter")?;

        let tracer_provider = SdkTracerProvider::builder()
            .with_batch_exporter(span_exporter)
            .with_sampler(Sampler::AlwaysOn)
            .with_id_generator(RandomIdGenerator::default())
            .with_resource(resource.clone())
            .build();
        let tracer = tracer_provider.tracer("moments");
        global::set_tracer_provider(tracer_provider.clone());

        let log_exporter = opentelemetry_otlp::LogExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .with_timeout(EXPORT_TIMEOUT)
            .build()
            .context("Failed to create OTLP log exporter")?;

        let logger_provider = SdkLoggerProvider::builder()
            .with_batch_exporter(log_exporter)
            .with_resource(resource)
            .build();

        tracing_subscriber::registry()
            .with(super::env_filter(log_level))
            .with(super::fmt_layer())
            .with(tracing_opentelemetry::layer().with_tracer(tracer))
            .with(OpenTelemetryTracingBridge::new(&logger_provider))
            .try_init()?;

        Ok(Providers {
            tracer: tracer_provider,
            logger: logger_provider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_directive_falls_back_to_info() {
        let filter = env_filter("keepsake=loudest");
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn test_directive_kept() {
        let filter = env_filter("keepsake=debug");
        assert_eq!(filter.to_string(), "keepsake=debug");
    }
}
