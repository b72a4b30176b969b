//! HTTP API for the as-run analyzer.
//!
//! A thin shell over the core: upload-and-ingest, an on-demand continuity
//! check, scheduler control, and store status. The scheduler is started
//! alongside the server so a deployed instance polls without operator
//! action.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | API banner |
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/ingest?filename=X.xml` | Ingest a raw XML document body |
//! | `GET`  | `/continuity` | Run one continuity check now |
//! | `GET`  | `/scheduler/status` | Scheduler state and next fire time |
//! | `POST` | `/scheduler/start` | Start the scheduler (idempotent) |
//! | `POST` | `/scheduler/stop` | Stop the scheduler (idempotent) |
//! | `GET`  | `/status` | Store statistics |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `transport_error` (502),
//! `internal` (500).

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::extract::XmlParseError;
use crate::ingest;
use crate::migrate;
use crate::poll::{self, PollContext};
use crate::scheduler::PollScheduler;
use crate::status;
use crate::transport::TransportError;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    ctx: Arc<PollContext>,
    scheduler: Arc<PollScheduler>,
}

/// Start the HTTP server and the poll scheduler next to it.
///
/// Binds to `[server].bind` and runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let config = Arc::new(config.clone());

    let pool = crate::db::connect(&config).await?;
    migrate::apply_schema(&pool).await?;

    let ctx = Arc::new(PollContext::from_config(config.clone(), pool)?);
    let scheduler = Arc::new(PollScheduler::new(ctx.clone()));
    scheduler.start().await?;

    let state = AppState {
        ctx,
        scheduler,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/ingest", post(handle_ingest))
        .route("/continuity", get(handle_continuity))
        .route("/scheduler/status", get(handle_scheduler_status))
        .route("/scheduler/start", post(handle_scheduler_start))
        .route("/scheduler/stop", post(handle_scheduler_stop))
        .route("/status", get(handle_status))
        .layer(cors)
        .with_state(state);

    println!("AsRun Analyzer listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn transport_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "transport_error".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map a core error onto the HTTP contract: a malformed document is the
/// client's fault, a transport failure is the remote host's, everything else
/// is ours.
fn classify_error(err: anyhow::Error) -> AppError {
    if err.downcast_ref::<XmlParseError>().is_some() {
        bad_request(format!("{:#}", err))
    } else if err.downcast_ref::<TransportError>().is_some() {
        transport_error(format!("{:#}", err))
    } else {
        internal(format!("{:#}", err))
    }
}

// ============ GET / ============

async fn handle_root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "AsRun Analyzer API" }))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /ingest ============

#[derive(Deserialize)]
struct IngestParams {
    filename: String,
}

async fn handle_ingest(
    State(state): State<AppState>,
    Query(params): Query<IngestParams>,
    body: String,
) -> Result<Json<crate::models::IngestReport>, AppError> {
    if params.filename.trim().is_empty() {
        return Err(bad_request("filename must not be empty"));
    }
    if body.trim().is_empty() {
        return Err(bad_request("request body must be a non-empty XML document"));
    }

    let report = ingest::ingest_document(&state.ctx.pool, params.filename.trim(), &body)
        .await
        .map_err(classify_error)?;
    Ok(Json(report))
}

// ============ GET /continuity ============

async fn handle_continuity(
    State(state): State<AppState>,
) -> Result<Json<crate::models::ContinuityOutcome>, AppError> {
    let outcome = poll::run_gap_check(&state.ctx).await.map_err(classify_error)?;
    Ok(Json(outcome))
}

// ============ Scheduler control ============

#[derive(Serialize)]
struct SchedulerStatus {
    status: String,
    next_run: Option<String>,
}

async fn scheduler_status(scheduler: &PollScheduler) -> Result<SchedulerStatus, AppError> {
    let running = scheduler.is_running().await;
    let next_run = scheduler
        .next_run()
        .await
        .map_err(classify_error)?
        .map(|t| t.to_rfc3339());
    Ok(SchedulerStatus {
        status: if running { "running" } else { "stopped" }.to_string(),
        next_run,
    })
}

async fn handle_scheduler_status(
    State(state): State<AppState>,
) -> Result<Json<SchedulerStatus>, AppError> {
    Ok(Json(scheduler_status(&state.scheduler).await?))
}

async fn handle_scheduler_start(
    State(state): State<AppState>,
) -> Result<Json<SchedulerStatus>, AppError> {
    state.scheduler.start().await.map_err(classify_error)?;
    Ok(Json(scheduler_status(&state.scheduler).await?))
}

async fn handle_scheduler_stop(
    State(state): State<AppState>,
) -> Result<Json<SchedulerStatus>, AppError> {
    state.scheduler.stop().await.map_err(classify_error)?;
    Ok(Json(scheduler_status(&state.scheduler).await?))
}

// ============ GET /status ============

async fn handle_status(
    State(state): State<AppState>,
) -> Result<Json<crate::models::StoreStats>, AppError> {
    let stats = status::collect_stats(&state.ctx.pool)
        .await
        .map_err(classify_error)?;
    Ok(Json(stats))
}
