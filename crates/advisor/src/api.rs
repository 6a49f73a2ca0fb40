//! HTTP API: recommendations, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use engine_lib::{
    ContainerSeries, EngineMetrics, NotificationKind, RecommendationEngine, RecommendationSet,
    StructuredLogger,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

const UNNAMED_CONTAINER: &str = "unnamed";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn RecommendationEngine>,
    pub metrics: EngineMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        engine: Arc<dyn RecommendationEngine>,
        metrics: EngineMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            engine,
            metrics,
            logger,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub container_name: Option<String>,
    /// Defaults to the latest timestamp in `series`
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub series: ContainerSeries,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub container_name: String,
    pub engine: String,
    pub end_time: DateTime<Utc>,
    pub recommendations: RecommendationSet,
}

#[derive(Debug, Deserialize)]
pub struct MinDataRequest {
    #[serde(default)]
    pub series: ContainerSeries,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MinDataResponse {
    pub min_data_available: bool,
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "engine": state.engine.engine_key(),
        })),
    )
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %err, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

async fn recommendations(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RecommendationRequest>,
) -> impl IntoResponse {
    let container_name = request
        .container_name
        .unwrap_or_else(|| UNNAMED_CONTAINER.to_string());
    let end_time = request
        .end_time
        .or_else(|| request.series.latest_timestamp())
        .unwrap_or_else(Utc::now);
    let engine_key = state.engine.engine_key().to_string();

    if !state.engine.check_min_data_available(&request.series) {
        state.metrics.inc_insufficient_data();
        state.logger.log_insufficient_data(
            &container_name,
            request.series.len(),
            request.series.total_duration_minutes(),
        );
    }

    let started = Instant::now();
    let recommendations = state
        .engine
        .generate_recommendation(&request.series, end_time);
    let elapsed = started.elapsed().as_secs_f64();

    state.metrics.observe_evaluation_latency(elapsed);
    state
        .metrics
        .record_recommendations(&engine_key, &recommendations);

    for (label, recommendation) in &recommendations {
        for notification in &recommendation.notifications {
            if notification.kind == NotificationKind::CalculationFailed {
                state
                    .logger
                    .log_recommendation_failed(&container_name, label, &notification.message);
            }
        }
    }
    state
        .logger
        .log_recommendation(&container_name, &engine_key, &recommendations, elapsed);

    Json(RecommendationResponse {
        container_name,
        engine: engine_key,
        end_time,
        recommendations,
    })
}

async fn min_data_check(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MinDataRequest>,
) -> impl IntoResponse {
    Json(MinDataResponse {
        min_data_available: state.engine.check_min_data_available(&request.series),
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/api/v1/recommendations", post(recommendations))
        .route("/api/v1/min-data-check", post(min_data_check))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
