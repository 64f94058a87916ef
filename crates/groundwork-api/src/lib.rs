//! # groundwork-api
//!
//! HTTP surface for groundwork project Q&A.
//!
//! Routes:
//! - `POST /api/v1/chat` answers a question about one project
//! - `POST /api/v1/projects/:project_id/sources/:source_type/sync` re-ingests
//!   one source type of a project
//! - `GET /health` reports backend availability

pub mod error;
pub mod handlers;
pub mod services;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use groundwork_core::defaults;

pub use error::ApiError;
pub use state::AppState;

/// Build the application router with tracing and body size limits.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/chat", post(handlers::chat))
        .route(
            "/api/v1/projects/:project_id/sources/:source_type/sync",
            post(handlers::sync_source),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(defaults::MAX_BODY_SIZE_BYTES))
        .with_state(state)
}

/// CORS layer admitting the given origins.
pub fn cors_layer(allowed_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Parse a comma-separated origin list, skipping invalid entries.
pub fn parse_allowed_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowed_origins_skips_blanks() {
        let origins = parse_allowed_origins(" http://localhost:5173, ,https://app.example.com ");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://localhost:5173");
        assert_eq!(origins[1], "https://app.example.com");
    }

    #[test]
    fn test_parse_allowed_origins_skips_invalid() {
        let origins = parse_allowed_origins("http://ok.example.com,bad\norigin");
        assert_eq!(origins.len(), 1);
    }
}
