//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store and service wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    Extension, Router,
    routing::{get, post},
};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower::ServiceBuilder;

use haulboard_core::SystemClock;

use crate::config::AppConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// Also starts the stale-task reaper on the current runtime.
pub async fn build_app(config: AppConfig) -> Router {
    let services = Arc::new(AppServices::in_memory(config, SystemClock::shared()));
    spawn_reaper(services.clone());
    router(services)
}

/// Router over already-built services.
pub fn router(services: Arc<AppServices>) -> Router {
    // Protected routes: require a known caller.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        services.clone(),
        middleware::identity_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/users", post(routes::system::register_user))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}

/// Periodically fail tasks whose runner never completed them.
pub fn spawn_reaper(services: Arc<AppServices>) -> JoinHandle<()> {
    let every = services.config.reaper_interval;
    let max_age = chrono::Duration::from_std(services.config.stale_task_after).unwrap_or(chrono::Duration::MAX);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match services.tasks.reap_stale(max_age) {
                Ok(0) => {}
                Ok(reaped) => tracing::warn!(reaped, "reaped stale tasks"),
                Err(e) => tracing::error!(error = %e, "stale task sweep failed"),
            }
        }
    })
}
