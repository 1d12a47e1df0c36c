//! Axum route handlers for estimation sessions.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::estimation::share::{build_share_summary, ShareSummary};
use crate::estimation::SUPPORTED_COUNTRIES;
use crate::pipeline::runner::{run_pipeline, SharedSession};
use crate::pipeline::state_machine::SessionSnapshot;
use crate::pipeline::uploads::read_uploads;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateInputRequest {
    pub country: Option<String>,
    pub requirements: Option<String>,
}

pub(crate) async fn find_session(state: &AppState, id: Uuid) -> Result<SharedSession, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/countries
pub async fn handle_list_countries() -> Json<Vec<&'static str>> {
    Json(SUPPORTED_COUNTRIES.to_vec())
}

/// POST /api/v1/sessions
///
/// Body is optional; the country defaults to the first supported market.
pub async fn handle_create_session(
    State(state): State<AppState>,
    request: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let country = match request.country.as_deref().map(str::trim) {
        Some("") => return Err(AppError::Validation("country cannot be empty".to_string())),
        Some(country) => country.to_string(),
        None => SUPPORTED_COUNTRIES[0].to_string(),
    };

    let session = state.sessions.create(&country).await;
    let snapshot = session.lock().await.snapshot();
    info!("Created session {} for {}", snapshot.id, snapshot.country);

    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = find_session(&state, id).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(snapshot))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// PUT /api/v1/sessions/:id/input
pub async fn handle_update_input(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateInputRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;

    if let Some(country) = &request.country {
        session.set_country(country)?;
    }
    if let Some(requirements) = &request.requirements {
        session.set_requirements(requirements)?;
    }

    Ok(Json(session.snapshot()))
}

/// POST /api/v1/sessions/:id/files
///
/// Multipart upload. Images and PDFs only; each file is capped at `MAX_UPLOAD_BYTES`.
pub async fn handle_upload_files(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let session = find_session(&state, id).await?;
    let files = read_uploads(multipart, state.config.max_upload_bytes).await?;

    let mut session = session.lock().await;
    let count = files.len();
    session.add_files(files, state.config.max_session_attachment_bytes)?;
    info!("Session {id}: {count} file(s) attached");

    Ok((StatusCode::CREATED, Json(session.snapshot())))
}

/// GET /api/v1/sessions/:id/files/:index
///
/// Raw bytes of one attachment, for previews. Snapshots only carry summaries.
pub async fn handle_get_file(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let session = find_session(&state, id).await?;
    let session = session.lock().await;
    let file = session.file(index)?;
    let disposition = format!("inline; filename=\"{}\"", file.file_name.replace('"', ""));

    Ok((
        [
            (header::CONTENT_TYPE, file.mime_type.clone()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.data.clone(),
    ))
}

/// DELETE /api/v1/sessions/:id/files/:index
pub async fn handle_remove_file(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    session.remove_file(index)?;
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/sessions/:id/estimate
///
/// Starts a run in the background and returns immediately; poll the session for progress.
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SessionSnapshot>), AppError> {
    let shared = find_session(&state, id).await?;
    let (ticket, snapshot) = {
        let mut session = shared.lock().await;
        let ticket = session.submit()?;
        (ticket, session.snapshot())
    };

    tokio::spawn(run_pipeline(
        shared,
        state.model.clone(),
        state.config.pipeline_options(),
        ticket,
    ));

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// POST /api/v1/sessions/:id/cancel
pub async fn handle_cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    session.cancel()?;
    Ok(Json(session.snapshot()))
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let session = find_session(&state, id).await?;
    let mut session = session.lock().await;
    session.reset()?;
    Ok(Json(session.snapshot()))
}

/// GET /api/v1/sessions/:id/share
pub async fn handle_share(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShareSummary>, AppError> {
    let session = find_session(&state, id).await?;
    let result = session
        .lock()
        .await
        .result()
        .cloned()
        .ok_or_else(|| AppError::Conflict("No estimate to share yet".to_string()))?;

    Ok(Json(build_share_summary(&result, &state.config.public_origin)?))
}
