// Trust Duplicates - Web Server
// REST API with Axum: POST a batch, get back duplicate clusters

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};
use trust_duplicates::{DetectionError, DuplicateDetector, Transaction};

/// Server configuration (flags or environment)
#[derive(Parser, Debug)]
#[command(name = "trust-duplicates-server")]
#[command(author, version, about = "HTTP API for duplicate transaction detection")]
struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "TRUST_DUPLICATES_ADDR", default_value = "0.0.0.0:3000")]
    addr: String,

    /// Cluster groups on all cores
    #[arg(long, env = "TRUST_DUPLICATES_PARALLEL")]
    parallel: bool,
}

/// Shared application state
#[derive(Clone)]
struct AppState {
    detector: Arc<DuplicateDetector>,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn detection_failed(err: DetectionError) -> Response {
    error!("Detection failed: {}", err);
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse::<()>::err(err.to_string())),
    )
        .into_response()
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/duplicates - Detection report for a batch
async fn find_duplicates(
    State(state): State<AppState>,
    Json(transactions): Json<Vec<Transaction>>,
) -> Response {
    match state.detector.report(&transactions) {
        Ok(report) => {
            info!(
                transactions = transactions.len(),
                clusters = report.summary.clusters,
                "duplicates requested"
            );
            (StatusCode::OK, Json(ApiResponse::ok(report))).into_response()
        }
        Err(err) => detection_failed(err),
    }
}

/// POST /api/suppress - Batch with duplicate retries removed
async fn suppress(
    State(state): State<AppState>,
    Json(transactions): Json<Vec<Transaction>>,
) -> Response {
    match state.detector.suppress(&transactions) {
        Ok(kept) => (StatusCode::OK, Json(ApiResponse::ok(kept))).into_response(),
        Err(err) => detection_failed(err),
    }
}

fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/duplicates", post(find_duplicates))
        .route("/suppress", post(suppress))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    println!("🌐 Trust Duplicates - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let detector = if config.parallel {
        DuplicateDetector::parallel()
    } else {
        DuplicateDetector::new()
    };
    let state = AppState {
        detector: Arc::new(detector),
    };

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;

    println!("\n🚀 Server running on http://{}", config.addr);
    println!("   API: POST http://{}/api/duplicates", config.addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, router(state)).await?;

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
