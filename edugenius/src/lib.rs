//! # edugenius: backend for an educational voice and document assistant
//!
//! `edugenius` is a thin HTTP service between a browser chat client and a hosted multimodal
//! model. It accepts three kinds of interaction, turns each into a chat-completion request for an
//! OpenAI-compatible API (Gemini by default), and voices the model's textual answer as MP3.
//!
//! ## Request Flow
//!
//! Handlers in [`api::handlers`] only extract and shape data; the flows live in
//! [`conversation`]:
//!
//! - **Chat** (`POST /chat`): prepend the system prompt to the client's history, complete, speak.
//! - **Voice input** (`POST /voice-input`): stage the upload with [`staging`], base64 it with
//!   [`encoding`], ask the model for a transcription, delete the staged clip.
//! - **Document chat** (`POST /document-chat`): stage the upload, base64 it as a `data:` URI with a
//!   content type inferred from its extension, ask the model about it, speak. The staged document
//!   is kept and its name returned as `document_id`.
//!
//! Speech goes through [`speech::SpeechService`]. A synthesis failure never fails a request; the
//! response just carries `audio_content: null`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use edugenius::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = edugenius::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     edugenius::telemetry::init_telemetry(config.enable_otel_export)?;
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
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod api;
pub mod completion;
pub mod config;
pub mod conversation;
pub mod encoding;
pub mod errors;
mod openapi;
pub mod speech;
pub mod staging;
mod static_assets;
pub mod telemetry;

#[cfg(test)]
mod test;

use crate::{
    completion::{CompletionClient, openai::OpenAiCompatClient},
    config::CorsOrigin,
    openapi::ApiDoc,
    speech::{GoogleTranslateTts, SpeechService},
};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, post},
};
use axum_prometheus::PrometheusMetricLayer;
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Application state shared across all request handlers.
///
/// Cloned per request; everything inside is either plain configuration or behind an `Arc`.
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub completion: Arc<dyn CompletionClient>,
    pub speech: SpeechService,
}

/// Create CORS layer from configuration.
///
/// A wildcard origin mirrors the request's origin, methods and headers back, which keeps
/// credentialed requests working (browsers reject a literal `*` alongside credentials).
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.cors;

    let mut cors = if cors_config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                // Origins never carry a trailing slash, Url::as_str always does for bare hosts
                origins.push(url.as_str().trim_end_matches('/').parse::<HeaderValue>()?);
            }
        }
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(AllowMethods::mirror_request())
            .allow_headers(AllowHeaders::mirror_request())
    };

    cors = cors.allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// Routes: the landing page and its assets, the three conversation endpoints (uploads limited to
/// `limits.max_upload_bytes`), `/healthz`, the Scalar docs at `/docs`, and `/internal/metrics`
/// when metrics are enabled. CORS and request tracing wrap everything.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let upload_limit = DefaultBodyLimit::max(state.config.limits.max_upload_bytes);
    let cors_layer = create_cors_layer(&state.config)?;
    let enable_metrics = state.config.enable_metrics;

    let mut router = Router::new()
        .route("/", get(api::handlers::pages::index))
        .route("/static/{*path}", get(api::handlers::pages::static_asset))
        .route("/chat", post(api::handlers::chat::chat))
        .route("/voice-input", post(api::handlers::voice::voice_input).layer(upload_limit.clone()))
        .route("/document-chat", post(api::handlers::documents::document_chat).layer(upload_limit))
        .route("/healthz", get(|| async { "OK" }))
        .with_state(state)
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(cors_layer);

    if enable_metrics {
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

/// Build the shared state from configuration: storage directories, completion client and speech.
async fn setup_state(config: Config) -> anyhow::Result<AppState> {
    for dir in [&config.storage.upload_dir, &config.storage.audio_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create storage directory {}: {}", dir.display(), e))?;
    }

    let completion = OpenAiCompatClient::from_config(&config.completion)?;
    info!(model = completion.model(), base_url = %config.completion.base_url, "Completion client ready");

    let speech = if config.speech.enabled {
        let tts = GoogleTranslateTts::from_config(&config.speech)?;
        SpeechService::new(Arc::new(tts), config.storage.audio_dir.clone())
    } else {
        info!("Speech synthesis disabled; responses will carry no audio");
        SpeechService::disabled(config.storage.audio_dir.clone())
    };

    Ok(AppState::builder()
        .config(config)
        .completion(Arc::new(completion))
        .speech(speech)
        .build())
}

pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting edugenius with configuration: {:#?}", config);

        let state = setup_state(config.clone()).await?;
        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "EduGenius listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
