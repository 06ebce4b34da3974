//! Logging and optional OpenTelemetry trace export.
//!
//! Console output goes through a `tracing-subscriber` fmt layer, either human readable (`pretty`)
//! or one JSON object per line (`json`), filtered by `RUST_LOG` (default `info`).
//!
//! Trace export is off unless `telemetry.otlp_endpoint` is set:
//!
//! ```yaml
//! telemetry:
//!   format: json
//!   otlp_endpoint: http://otel-collector:4318
//!   service_name: ocrctl
//! ```
//!
//! Spans are exported over OTLP/HTTP with protobuf encoding. Extra headers (e.g. an auth token for
//! a hosted collector) are read from `OTEL_EXPORTER_OTLP_HEADERS` as comma-separated `key=value`
//! pairs, with `%20` standing in for spaces.

use opentelemetry::KeyValue;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::collections::HashMap;
use std::sync::OnceLock;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, TelemetryConfig};

/// Provider kept alive so pending spans can be flushed at shutdown; `tracing-opentelemetry` only
/// holds the tracer.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Install the global tracing subscriber.
///
/// A failure to build the OTLP exporter is reported and logging continues without export.
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = match config.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };

    let mut export_error = None;
    let otel_layer = match config.otlp_endpoint.as_deref() {
        Some(endpoint) => match create_otlp_tracer(endpoint, &config.service_name) {
            Ok(tracer) => Some(tracing_opentelemetry::layer().with_tracer(tracer)),
            Err(e) => {
                export_error = Some(e);
                None
            }
        },
        None => None,
    };
    let exporting = otel_layer.is_some();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer)
        .with(fmt_layer)
        .try_init()?;

    match (exporting, export_error) {
        (true, _) => info!(format = ?config.format, "Telemetry initialized with OTLP export enabled"),
        (false, Some(e)) => tracing::warn!("Telemetry initialized without OTLP export: {e:#}"),
        (false, None) => info!(format = ?config.format, "Telemetry initialized (OTLP export disabled)"),
    }

    Ok(())
}

/// Parse `OTEL_EXPORTER_OTLP_HEADERS`-style `k=v,k2=v2` pairs.
fn parse_headers(raw: &str) -> HashMap<String, String> {
    raw.replace("%20", " ")
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

fn create_otlp_tracer(endpoint: &str, service_name: &str) -> anyhow::Result<opentelemetry_sdk::trace::Tracer> {
    let headers = std::env::var("OTEL_EXPORTER_OTLP_HEADERS")
        .map(|raw| parse_headers(&raw))
        .unwrap_or_default();

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(format!("{}/v1/traces", endpoint.trim_end_matches('/')))
        .with_protocol(Protocol::HttpBinary)
        .with_headers(headers)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(
            opentelemetry_sdk::Resource::builder()
                .with_attribute(KeyValue::new("service.name", service_name.to_string()))
                .build(),
        )
        .build();

    let tracer = tracer_provider.tracer(service_name.to_string());
    let _ = TRACER_PROVIDER.set(tracer_provider);

    Ok(tracer)
}

/// Flush and shut down the tracer provider, if export was enabled
pub fn shutdown_telemetry() {
    if let Some(provider) = TRACER_PROVIDER.get()
        && let Err(e) = provider.shutdown()
    {
        tracing::error!("Failed to shutdown tracer provider: {}", e);
    }
}
