use crate::handlers;
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/session", get(handlers::get_session))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route(
            "/api/daily",
            get(handlers::get_daily_history).post(handlers::post_daily),
        )
        .route(
            "/api/weekly",
            get(handlers::get_weekly_history).post(handlers::post_weekly),
        )
        .route("/api/machines", get(handlers::get_machines))
        .route("/api/events", get(handlers::events))
        .with_state(state)
}
