//! # ocrctl: image text extraction service
//!
//! `ocrctl` is a small HTTP service that stores uploaded images in object storage, runs them
//! through a cloud OCR engine, and writes the extracted text out as a CSV table that clients can
//! download.
//!
//! ## Request Flow
//!
//! A client drives the pipeline in three calls, threading the locators returned by one call into
//! the next:
//!
//! 1. `POST /upload` with one or more `images` multipart parts. Each image is written under
//!    `images/{uuid}_{filename}` and its locator is returned.
//! 2. `POST /process` with `{"image_urls": [...]}`. Each image is fetched and sent to the OCR engine
//!    in request order; when every image succeeds a two-column table (`image_url,extracted_text`) is
//!    written under `outputs/output_{uuid}.csv` and its locator is returned. A single failure
//!    aborts the request and no table is written.
//! 3. `GET /download?csv_url=...` returns the stored bytes as a file attachment.
//!
//! Locators look like `s3://my-bucket/images/0b9e..._receipt.png`. Clients treat them as opaque.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum). Storage and OCR sit behind the
//! [`storage::ObjectStorage`] and [`ocr::OcrEngine`] traits; the concrete clients are built once at
//! startup from [`Config`] and handed to handlers through [`AppState`], so tests swap in in-memory
//! fakes without touching the handlers.
//!
//! - **Storage** ([`storage`]): AWS S3 (or any S3-compatible service), Google Cloud Storage, and a
//!   local directory backend
//! - **OCR** ([`ocr`]): Google Cloud Vision (REST, API key) and AWS Textract
//! - **Extraction** ([`extraction`]): bounded, order-preserving fan-out and CSV serialization
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use ocrctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = ocrctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     ocrctl::telemetry::init_telemetry(&config.telemetry)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod extraction;
mod metrics;
pub mod ocr;
mod openapi;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use crate::config::CorsOrigin;
use crate::ocr::OcrEngine;
use crate::openapi::ApiDoc;
use crate::storage::ObjectStorage;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Json, Router,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// The storage and OCR clients are constructed once and shared; handlers never build their own.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .storage(storage)
///     .ocr(ocr)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn ObjectStorage>,
    pub ocr: Arc<dyn OcrEngine>,
}

/// Build the CORS layer, or `None` when no origins are configured.
fn create_cors_layer(config: &Config) -> anyhow::Result<Option<CorsLayer>> {
    let origins = &config.cors.allowed_origins;
    if origins.is_empty() {
        return Ok(None);
    }

    let allow_origin = if origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut values = Vec::new();
        for origin in origins {
            if let CorsOrigin::Url(url) = origin {
                values.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(values)
    };

    let mut cors = CorsLayer::new().allow_origin(allow_origin).allow_methods([
        axum::http::Method::GET,
        axum::http::Method::POST,
    ]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(Some(cors))
}

/// Build the application router with all endpoints and middleware.
///
/// - `/upload`, `/process`, `/download`: the extraction pipeline
/// - `/healthz`: liveness probe
/// - `/api-docs/openapi.json` and `/docs`: API documentation
/// - `/internal/metrics`: Prometheus exposition, only when `enable_metrics` is set
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let upload_limit = state.config.limits.max_upload_bytes;

    let router = Router::new()
        .route(
            "/upload",
            post(api::handlers::upload::upload_images).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/process", post(api::handlers::process::process_images))
        .route("/download", get(api::handlers::download::download_table))
        .route("/healthz", get(|| async { "OK" }))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let mut router = match create_cors_layer(&state.config)? {
        Some(cors_layer) => router.layer(cors_layer),
        None => router,
    };

    if state.config.enable_metrics {
        let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();
        router = router
            .route("/internal/metrics", get(|| async move { metric_handle.render() }))
            .layer(prometheus_layer);
    }

    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// The assembled service: configuration, clients, and router.
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Build the storage and OCR clients from configuration and assemble the router
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!(
            storage = ?config.storage,
            concurrency = config.process.concurrency,
            max_upload_bytes = config.limits.max_upload_bytes,
            "Starting ocrctl"
        );

        let storage = storage::create_object_storage(&config).await?;
        let ocr = ocr::create_ocr_engine(&config.ocr).await?;
        info!(
            bucket = %config.bucket,
            storage = storage.scheme(),
            ocr = ocr.name(),
            "Initialized external clients"
        );

        let state = AppState::builder().config(config).storage(storage).ocr(ocr).build();
        Self::from_state(state)
    }

    /// Assemble an application around already-constructed clients
    pub fn from_state(state: AppState) -> anyhow::Result<Self> {
        let router = build_router(&state)?;
        Ok(Self {
            router,
            config: state.config,
        })
    }

    /// Serve until `shutdown` resolves, then flush telemetry
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "ocrctl listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
