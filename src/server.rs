use crate::config::SolverConfig;
use crate::data::{Dataset, TimetableRecord};
use crate::error::TimetableError;
use crate::solver;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing::post};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;

/// Body of `POST /v1/timetable/solve`: the five tables plus optional tuning.
#[derive(Debug, Deserialize)]
pub struct SolveRequest {
    #[serde(flatten)]
    pub dataset: Dataset,
    #[serde(default)]
    pub config: Option<SolverConfig>,
}

#[derive(Debug, Serialize)]
struct Failure {
    kind: &'static str,
    message: String,
    /// Always empty; a failed run never yields a partial timetable.
    records: Vec<TimetableRecord>,
}

fn failure(status: StatusCode, kind: &'static str, message: String) -> Response {
    let body = Failure {
        kind,
        message,
        records: Vec::new(),
    };
    (status, Json(body)).into_response()
}

fn error_response(e: &TimetableError) -> Response {
    let status = if e.is_infeasible() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::BAD_REQUEST
    };
    warn!("Solve request failed: {}", e);
    failure(status, e.kind(), e.to_string())
}

async fn solve_handler(
    State(defaults): State<Arc<SolverConfig>>,
    Json(request): Json<SolveRequest>,
) -> Response {
    let SolveRequest { dataset, config } = request;
    let config = config.unwrap_or_else(|| defaults.as_ref().clone());

    // the engine call blocks for up to the time budget
    let solved = tokio::task::spawn_blocking(move || solver::solve(&dataset, &config)).await;
    match solved {
        Ok(Ok(timetable)) => (StatusCode::OK, Json(timetable)).into_response(),
        Ok(Err(e)) => error_response(&e),
        Err(e) => {
            error!("Solver task failed: {}", e);
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "solver task failed".to_string(),
            )
        }
    }
}

/// Routes with one solve admitted at a time; `defaults` applies to requests
/// without a `config` object.
pub fn router(defaults: SolverConfig) -> Router {
    Router::new()
        .route("/v1/timetable/solve", post(solve_handler))
        .layer(ConcurrencyLimitLayer::new(1))
        .with_state(Arc::new(defaults))
}

pub async fn run_server(addr: &str, defaults: SolverConfig) -> std::io::Result<()> {
    let app = router(defaults);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server running at http://{}", listener.local_addr()?);
    axum::serve(listener, app).await
}
