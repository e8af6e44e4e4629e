//! HTTP JSON API: axum router over the whiff watcher.

use std::any::Any;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

use crate::config;
use crate::output::snapshot;
use crate::pipeline::envelope::{self, iso_timestamp, ResponseEnvelope};
use crate::watcher::WhiffWatcher;

/// Shared state accessible by all route handlers.
#[derive(Clone)]
pub struct AppState {
    watcher: Arc<WhiffWatcher>,
}

impl AppState {
    pub fn new(watcher: Arc<WhiffWatcher>) -> Self {
        Self { watcher }
    }
}

pub fn router(state: AppState) -> Router {
    let static_dir = state.watcher.config().server.static_dir.clone();

    Router::new()
        .route("/", get(index_handler))
        .route("/api/whiff-watch-data", get(whiff_data_handler))
        .route("/api/generate-json", get(generate_json_handler))
        .route("/whiff-rankings", get(rankings_handler))
        .nest_service("/static", ServeDir::new(static_dir))
        .fallback(not_found_handler)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve `app` on an already-bound listener until the server stops.
pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!(addr = %addr, "Whiff Watcher API listening");
    axum::serve(listener, app).await.context("HTTP server error")
}

// -- Route Handlers --

#[derive(Debug, Deserialize)]
struct DataQuery {
    date: Option<String>,
}

async fn index_handler() -> impl IntoResponse {
    Json(json!({"message": "Whiff Watcher API is live"}))
}

async fn whiff_data_handler(
    State(state): State<AppState>,
    Query(query): Query<DataQuery>,
) -> Json<ResponseEnvelope> {
    let date = match query.date.as_deref().map(config::parse_date).transpose() {
        Ok(date) => date,
        Err(e) => {
            warn!(error = %e, "Rejected date parameter");
            return Json(envelope::build_error("InvalidDate", e.to_string()));
        }
    };

    Json(state.watcher.generate(date).await)
}

async fn generate_json_handler(State(state): State<AppState>) -> Response {
    let server = &state.watcher.config().server;
    let envelope = state.watcher.generate(None).await;

    match snapshot::write(&server.snapshot_path(), &envelope).await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "JSON file generated successfully",
            "file_path": format!("/static/{}", server.snapshot_file),
            "total_ratings": envelope.total_ratings(),
            "timestamp": envelope.generated_at(),
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "Snapshot write failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Failed to generate JSON file",
                    "message": format!("{e:#}"),
                    "timestamp": iso_timestamp(&Local::now()),
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct Ranking<'a> {
    name: &'a str,
    team: &'a str,
    pitcher: &'a str,
    batter_k_pct: f64,
    pitcher_k_pct: f64,
    whiff_score: f64,
}

async fn rankings_handler(State(state): State<AppState>) -> Response {
    let envelope = state.watcher.generate(None).await;

    let rankings: Vec<Ranking<'_>> = envelope
        .matchups()
        .iter()
        .map(|m| Ranking {
            name: m.batter.name(),
            team: m.batter.team(),
            pitcher: m.pitcher.name(),
            batter_k_pct: m.batter.strikeout_rate_pct,
            pitcher_k_pct: m.pitcher.strikeout_rate_pct,
            whiff_score: m.whiff_score,
        })
        .collect();

    Json(json!({ "rankings": rankings })).into_response()
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "message": "The requested resource was not found on this server.",
            "timestamp": iso_timestamp(&Local::now()),
        })),
    )
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "Internal server error",
            "message": "An unexpected error occurred while processing your request.",
            "timestamp": iso_timestamp(&Local::now()),
        })),
    )
        .into_response()
}
