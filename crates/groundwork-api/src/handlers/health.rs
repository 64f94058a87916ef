//! Health endpoint.

use axum::{extract::State, response::IntoResponse, Json};
use tracing::warn;

use groundwork_core::{EmbeddingBackend, GenerationBackend};

use crate::AppState;

/// `GET /health`
///
/// Always `200`; `status` is `degraded` when the generative service does
/// not answer, since chat then serves only templated answers.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let generation_available = match state.generator.health_check().await {
        Ok(available) => available,
        Err(e) => {
            warn!(subsystem = "api", component = "health", error = %e, "Generation health check failed");
            false
        }
    };

    Json(serde_json::json!({
        "status": if generation_available { "healthy" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "embedding": {
            "model": state.embedder.model_name(),
            "dimension": state.embedder.dimension(),
        },
        "generation": {
            "model": state.generator.model_name(),
            "available": generation_available,
        },
    }))
}
