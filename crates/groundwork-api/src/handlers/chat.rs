//! Chat endpoint.

use axum::{extract::State, Json};

use groundwork_core::{ChatRequest, ChatResponse};

use crate::{ApiError, AppState};

/// `POST /api/v1/chat`
///
/// Answers `message` from the chunks of `projectId`. Missing fields are a
/// `400`, an unknown project a `404`, and an unavailable embedding backend
/// a `502`. A failing generative service still yields `200` with a
/// templated answer and `metadata.fallback = true`.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state.ask.ask(&request).await?;
    Ok(Json(response))
}
