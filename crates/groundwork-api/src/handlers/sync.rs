//! Source sync endpoint.

use axum::{
    extract::{Path, State},
    Json,
};

use groundwork_core::{Error, IngestReport, ProjectDirectory, SourceType, SyncRequest};

use crate::{ApiError, AppState};

/// `POST /api/v1/projects/:project_id/sources/:source_type/sync`
///
/// Replaces the project's chunks for one source type with the chunks of
/// the submitted documents and returns the per-document report.
pub async fn sync_source(
    State(state): State<AppState>,
    Path((project_id, source_type)): Path<(i64, String)>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<IngestReport>, ApiError> {
    let source_type: SourceType = source_type.parse()?;

    if state.projects.project_name(project_id).await?.is_none() {
        return Err(Error::ProjectNotFound(project_id).into());
    }

    let report = state
        .ingest
        .sync(project_id, source_type, request.documents)
        .await?;
    Ok(Json(report))
}
