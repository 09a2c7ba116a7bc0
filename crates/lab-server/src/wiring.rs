use api::AppState;
use axum::{routing::get, Router};

pub fn build_app(state: AppState) -> Router {
    api::app_with_state(state).route("/health", get(healthcheck))
}

async fn healthcheck() -> &'static str {
    "ok"
}
