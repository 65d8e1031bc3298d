//! HTTP surface: REST resources, the notification socket and static uploads.

pub mod admin;
pub mod auth;
pub mod categories;
pub mod orders;
pub mod products;
pub mod upload;
pub mod users;
pub mod variants;
pub mod vendors;
pub mod ws;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(state.config.frontend_url.as_deref());
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::connect))
        .nest("/auth", auth::routes())
        .nest("/api/users", users::routes())
        .nest("/api/admin", admin::routes())
        .nest("/api/products", products::routes())
        .nest("/api/variants", variants::routes())
        .nest("/api/vendors", vendors::routes())
        .nest("/api/orders", orders::routes())
        .nest("/api/categories", categories::routes())
        .nest("/api/upload", upload::routes())
        .nest_service("/uploads", uploads)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let Some(origin) = frontend_url else { return CorsLayer::permissive() };
    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(true),
        Err(e) => {
            tracing::warn!(error = %e, origin, "invalid FRONTEND_URL, allowing any origin");
            CorsLayer::permissive()
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": "marketplace" }))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "success": false, "message": "Route not found" })))
}

/// `{ "success": true, "message": ... }`
pub(crate) fn ok_message(message: &str) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "message": message }))
}

/// Client address as reported by the first proxy hop, and the user agent.
pub(crate) fn client_info(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let agent = headers.get(USER_AGENT).and_then(|v| v.to_str().ok()).map(str::to_string);
    (ip, agent)
}

pub(crate) fn validate<T: validator::Validate>(body: &T) -> Result<(), ApiError> {
    body.validate().map_err(ApiError::from)
}
