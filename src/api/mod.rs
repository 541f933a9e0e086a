//! REST API over a live simulation.
//!
//! Read endpoints:
//! - `/state`: clock position and grid snapshot
//! - `/log`: event log, newest first
//! - `/summary`: DR statistics
//! - `/load-profile`: jittered load profile
//!
//! Control endpoints (`POST`): `/clock/start`, `/clock/stop`,
//! `/clock/restart`, `/clock/jump`, `/nodes/{id}/click`, `/recover`.

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

use crate::load_profile::LoadProfile;
use crate::sim::Simulation;

/// Shared application state.
///
/// The simulation sits behind a single async mutex; the driver task and
/// every request handler take turns on it, which serializes ticks and user
/// intents.
pub struct AppState {
    pub sim: Mutex<Simulation>,
    pub profile: LoadProfile,
    pub profile_rng: Mutex<StdRng>,
}

impl AppState {
    pub fn new(sim: Simulation, profile: LoadProfile, seed: u64) -> Self {
        Self {
            sim: Mutex::new(sim),
            profile,
            profile_rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/log", get(handlers::get_log))
        .route("/summary", get(handlers::get_summary))
        .route("/load-profile", get(handlers::get_load_profile))
        .route("/clock/start", post(handlers::post_start))
        .route("/clock/stop", post(handlers::post_stop))
        .route("/clock/restart", post(handlers::post_restart))
        .route("/clock/jump", post(handlers::post_jump))
        .route("/nodes/{id}/click", post(handlers::post_click))
        .route("/recover", post(handlers::post_recover))
        .with_state(state)
}

/// Spawns the task translating wall-clock time into simulation time.
///
/// Virtual time tracks the elapsed wall time since the driver started, so
/// a late wakeup catches up instead of drifting.
pub fn spawn_driver(state: Arc<AppState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let origin = state.sim.lock().await.now_ms();
        let started = Instant::now();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            state
                .sim
                .lock()
                .await
                .advance_to(origin.saturating_add(elapsed));
        }
    })
}

/// Binds to the given address and serves the API, driving the simulation in
/// real time.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    let driver = spawn_driver(state.clone(), Duration::from_millis(50));
    let app = router(state);
    let result = axum::serve(listener, app).await;
    driver.abort();
    result
}
