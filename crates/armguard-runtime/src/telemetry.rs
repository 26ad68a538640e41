//! Tracing pipeline initialisation.
//!
//! Call [`init_tracing`] once at process startup, before the control loop is
//! started.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector base URL (e.g. `http://localhost:4318`). Enables span export over HTTP. |
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `ARMGUARD_LOG_FORMAT=json` | Newline-delimited JSON instead of compact text. |
//!
//! # Example
//!
//! ```rust,no_run
//! let _guard = armguard_runtime::telemetry::init_tracing("armguard");
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_FORMAT_VAR: &str = "ARMGUARD_LOG_FORMAT";
const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Install the global `tracing` subscriber.
///
/// The returned guard must live as long as the process; dropping it flushes
/// the span exporter.  Calling this twice in one process panics inside
/// `tracing-subscriber`, use [`try_init_tracing`] where that can happen.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    let (guard, result) = install(service_name);
    if let Err(e) = result {
        panic!("global tracing subscriber already installed: {e}");
    }
    guard
}

/// Like [`init_tracing`] but tolerates an already-installed subscriber, in
/// which case nothing is replaced and the guard holds no provider.
pub fn try_init_tracing(service_name: &str) -> TracerProviderGuard {
    match install(service_name) {
        (guard, Ok(())) => guard,
        (_, Err(_)) => TracerProviderGuard(None),
    }
}

fn install(
    service_name: &str,
) -> (TracerProviderGuard, Result<(), tracing_subscriber::util::TryInitError>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let use_json = std::env::var(LOG_FORMAT_VAR).as_deref() == Ok("json");

    let provider = build_provider(service_name);
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("armguard")));

    let registry = tracing_subscriber::registry().with(env_filter).with(otel_layer);
    let result = if use_json {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer().compact()).try_init()
    };

    (TracerProviderGuard(provider), result)
}

// ─────────────────────────────────────────────────────────────────────────────
// RAII guard
// ─────────────────────────────────────────────────────────────────────────────

/// Shuts the OTel [`SdkTracerProvider`] down on drop.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    /// `true` when spans are being exported.
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("[armguard] OpenTelemetry provider shutdown error: {e}");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

/// `None` when no endpoint is configured or the exporter fails to build;
/// the caller then logs to the console only.
fn build_provider(service_name: &str) -> Option<SdkTracerProvider> {
    let endpoint = std::env::var(OTLP_ENDPOINT_VAR).ok()?;

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[armguard] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    // Simple (synchronous) exporter: the control loop runs on a plain OS
    // thread and there is no async runtime to host a batch exporter.
    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            .with_simple_exporter(exporter)
            .build(),
    )
}
