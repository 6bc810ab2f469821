use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{self, AppState};
use crate::complaints;
use crate::error::ApiError;
use crate::messages;
use crate::middleware::require_auth;
use crate::stats;

/// Assemble the full application router. Lives here rather than in the
/// server binary so integration tests can drive the exact production router.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/seed", post(auth::seed))
        .route("/stats", get(stats::stats))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/complaints", post(complaints::create).get(complaints::list))
        .route(
            "/complaints/{id}",
            get(complaints::get_one)
                .put(complaints::update)
                .delete(complaints::destroy),
        )
        .route("/complaints/{id}/messages", post(messages::add_message))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ))
        .with_state(state);

    Router::new()
        .nest("/api", public.merge(protected))
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "message": "CampusAlert API is running",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("CAMPUS_ENV").unwrap_or_else(|_| "development".into()),
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("API endpoint not found".into())
}
