//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;

use super::AppState;
use super::types::{
    ClockResponse, ErrorResponse, JumpRequest, JumpResponse, LogLine, LogQuery, StateResponse,
};
use crate::load_profile::LoadProfileSnapshot;
use crate::sim::kpi::DrSummary;
use crate::sim::{HourOutcome, JumpError, Simulation};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

fn clock(sim: &Simulation, changed: bool) -> Json<ClockResponse> {
    Json(ClockResponse {
        hour: sim.hour(),
        running: sim.is_running(),
        changed,
    })
}

/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    let sim = state.sim.lock().await;
    Json(StateResponse {
        hour: sim.hour(),
        running: sim.is_running(),
        has_error: sim.has_error(),
        now_ms: sim.now_ms(),
        log_entries: sim.log().len(),
        state: sim.state().clone(),
    })
}

/// Returns event-log lines, newest first.
///
/// `GET /log` → every line
/// `GET /log?limit=N` → the N newest lines
pub async fn get_log(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Json<Vec<LogLine>> {
    let sim = state.sim.lock().await;
    let limit = query.limit.unwrap_or(usize::MAX);
    Json(sim.log().latest(limit).map(LogLine::from).collect())
}

/// `GET /summary` → 200 + `DrSummary` JSON
pub async fn get_summary(State(state): State<Arc<AppState>>) -> Json<DrSummary> {
    Json(state.sim.lock().await.summary())
}

/// `GET /load-profile` → jittered copy of the loaded profile
pub async fn get_load_profile(State(state): State<Arc<AppState>>) -> Json<LoadProfileSnapshot> {
    let mut rng = state.profile_rng.lock().await;
    Json(state.profile.snapshot(&mut *rng, Utc::now()))
}

/// `POST /clock/start`
pub async fn post_start(State(state): State<Arc<AppState>>) -> Result<Json<ClockResponse>, ApiError> {
    let mut sim = state.sim.lock().await;
    if sim.has_error() {
        return Err(api_error(
            StatusCode::CONFLICT,
            "simulation is in error state; POST /recover first",
        ));
    }
    let changed = sim.start();
    Ok(clock(&sim, changed))
}

/// `POST /clock/stop`
pub async fn post_stop(State(state): State<Arc<AppState>>) -> Json<ClockResponse> {
    let mut sim = state.sim.lock().await;
    let changed = sim.stop();
    clock(&sim, changed)
}

/// `POST /clock/restart`
pub async fn post_restart(State(state): State<Arc<AppState>>) -> Json<ClockResponse> {
    let mut sim = state.sim.lock().await;
    sim.restart();
    clock(&sim, true)
}

/// Jumps to an hour of the year.
///
/// `POST /clock/jump {"hour": N}` → 200 + `JumpResponse`
/// out-of-range hour → 400 + `ErrorResponse`
/// rejected DR update → 422 + `ErrorResponse`
pub async fn post_jump(
    State(state): State<Arc<AppState>>,
    Json(req): Json<JumpRequest>,
) -> Result<Json<JumpResponse>, ApiError> {
    let mut sim = state.sim.lock().await;
    match sim.jump_to(req.hour) {
        Ok(HourOutcome::Idle) => Ok(Json(JumpResponse {
            hour: sim.hour(),
            dispatched: false,
            cascade: None,
        })),
        Ok(HourOutcome::Dispatched { hour, cascade, .. }) => Ok(Json(JumpResponse {
            hour,
            dispatched: true,
            cascade: Some(cascade),
        })),
        Err(err @ JumpError::OutOfRange(_)) => Err(api_error(StatusCode::BAD_REQUEST, err)),
        Err(err @ JumpError::Hour(_)) => Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, err)),
    }
}

/// `POST /nodes/{id}/click` → 204
pub async fn post_click(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> StatusCode {
    state.sim.lock().await.click(&id);
    StatusCode::NO_CONTENT
}

/// `POST /recover`
pub async fn post_recover(State(state): State<Arc<AppState>>) -> Json<ClockResponse> {
    let mut sim = state.sim.lock().await;
    sim.recover();
    clock(&sim, true)
}
