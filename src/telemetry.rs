//! Tracing setup: rolling log files, stdout and optional OTLP export
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

pub const SERVICE_NAME: &str = "drt_planner";

/// Keeps the log writer and span exporter alive. Call [`Telemetry::shutdown`] before exiting.
pub struct Telemetry {
    _file_guard: WorkerGuard,
    provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                error!("error shutting down the span exporter: {e}");
            }
        }
    }
}

fn otlp_provider(endpoint: &str) -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .with_timeout(Duration::from_millis(1000))
        .with_protocol(opentelemetry_otlp::Protocol::Grpc)
        .build()
        .context("error building the OTLP exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
        .build())
}

pub fn init(log_dir: &Path, otlp_endpoint: Option<&str>) -> Result<Telemetry> {
    let provider = otlp_endpoint.map(otlp_provider).transpose()?;

    let telemetry_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(SERVICE_NAME)));

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let appender = tracing_appender::rolling::daily(log_dir, "drt_planner.log");
    let (non_blocking_appender, file_guard) = tracing_appender::non_blocking(appender);

    // A layer that logs events to rolling files.
    let file_log = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_appender)
        .with_ansi(false)
        .pretty();

    let stdout_log = tracing_subscriber::fmt::layer().compact();

    Registry::default()
        .with(telemetry_layer)
        .with(file_log)
        .with(stdout_log)
        .with(env_filter)
        .try_init()
        .context("error installing the tracing subscriber")?;

    Ok(Telemetry {
        _file_guard: file_guard,
        provider,
    })
}
