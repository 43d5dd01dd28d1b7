use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Instant};
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod config;
mod difficulty;
mod engine;
mod error;
mod feedback;
mod forest;
mod label;
mod scoring;
mod similarity;
mod types;

use config::Config;
use engine::AdmitEngine;
use error::AppError;
use types::*;

type AppState = Arc<AdmitEngine>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "admitguide_engine=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load();
    info!("Loaded configuration: {:?}", config);
    let port = config.port;

    // Build the engine: catalog load, label derivation, model fit and
    // similarity fit happen here, before the server accepts traffic.
    let engine = AdmitEngine::new(config).await?;
    let app_state = Arc::new(engine);

    // Initialize metrics exporter
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .install()
        .expect("Failed to install Prometheus exporter");

    // Build router
    let app = Router::new()
        .route("/evaluate", post(evaluate_handler))
        .route("/search", post(search_handler))
        .route("/feedback", post(feedback_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting AdmitGuide engine on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn evaluate_handler(
    State(engine): State<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let start = Instant::now();
    metrics::increment_counter!("admitguide_requests_total", "endpoint" => "admission_predict");

    let result = engine.evaluate_admission(request).await?;

    metrics::histogram!(
        "admitguide_response_seconds",
        start.elapsed().as_secs_f64(),
        "endpoint" => "admission_predict"
    );
    Ok(Json(result))
}

async fn search_handler(
    State(engine): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let start = Instant::now();
    metrics::increment_counter!("admitguide_requests_total", "endpoint" => "program_search");

    let result = engine.search_programs(&request.interest);

    metrics::histogram!(
        "admitguide_response_seconds",
        start.elapsed().as_secs_f64(),
        "endpoint" => "program_search"
    );
    Ok(Json(result))
}

async fn feedback_handler(
    State(engine): State<AppState>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let written = engine.record_feedback(&request.text).await?;

    let message = if written {
        "Feedback recorded".to_string()
    } else {
        "Feedback was empty, nothing recorded".to_string()
    };
    Ok(Json(FeedbackResponse {
        success: written,
        message,
    }))
}

async fn health_handler(State(engine): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "universities": engine.catalog().len(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    })))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Shutdown signal received, starting graceful shutdown");
}
