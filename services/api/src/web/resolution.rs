//! services/api/src/web/resolution.rs
//!
//! Handlers for the cancel / replace / reschedule choices an editor makes after
//! a slot submission was rejected with a clash. State is kept per editor.

use crate::web::{response::RestError, state::AppState};
use axum::{
    extract::{Path, State},
    response::Json,
    Extension,
};
use serde::Serialize;
use std::sync::Arc;
use timetable_core::{EditorSession, ResolutionState, Slot, SlotDraft};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

/// The pre-filled form to reopen after choosing "reschedule".
#[derive(Serialize, ToSchema)]
pub struct RescheduleResponse {
    pub draft: SlotDraft,
}

/// Show the editor's current resolution state.
#[utoipa::path(
    get,
    path = "/timetables/{timetable_id}/resolution",
    params(("timetable_id" = Uuid, Path, description = "The timetable.")),
    responses(
        (status = 200, description = "Current state", body = ResolutionState),
        (status = 404, description = "Timetable not found")
    )
)]
pub async fn resolution_state_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<EditorSession>,
    Path(timetable_id): Path<Uuid>,
) -> Result<Json<ResolutionState>, RestError> {
    let workspace = app_state.workspace(timetable_id).await?;
    let workspace = workspace.lock().await;
    Ok(Json(workspace.resolution_state(&session)))
}

/// Discard the pending candidate.
#[utoipa::path(
    post,
    path = "/timetables/{timetable_id}/resolution/cancel",
    params(("timetable_id" = Uuid, Path, description = "The timetable.")),
    responses(
        (status = 200, description = "Back to idle", body = ResolutionState),
        (status = 404, description = "Timetable not found"),
        (status = 409, description = "Nothing is pending")
    )
)]
pub async fn cancel_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<EditorSession>,
    Path(timetable_id): Path<Uuid>,
) -> Result<Json<ResolutionState>, RestError> {
    let workspace = app_state.workspace(timetable_id).await?;
    let mut workspace = workspace.lock().await;

    let (_, editor) = workspace.editing(&session);
    editor.cancel()?;
    Ok(Json(editor.state().clone()))
}

/// Remove every slot the pending candidate clashes with and store the candidate.
#[utoipa::path(
    post,
    path = "/timetables/{timetable_id}/resolution/replace",
    params(("timetable_id" = Uuid, Path, description = "The timetable.")),
    responses(
        (status = 200, description = "Candidate stored", body = Slot),
        (status = 404, description = "Timetable not found"),
        (status = 409, description = "Nothing is pending, or the grid changed and the candidate clashes anew", body = crate::web::response::ClashResponse)
    )
)]
pub async fn replace_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<EditorSession>,
    Path(timetable_id): Path<Uuid>,
) -> Result<Json<Slot>, RestError> {
    let workspace = app_state.workspace(timetable_id).await?;
    let mut workspace = workspace.lock().await;

    let (grid, editor) = workspace.editing(&session);
    let slot = editor.replace(grid)?;
    app_state.commit(&mut workspace).await?;

    info!(
        "{} replaced clashing slots with {} in timetable {}",
        session.display_name, slot.id, timetable_id
    );
    Ok(Json(slot))
}

/// Discard the pending candidate and get its values back for editing.
#[utoipa::path(
    post,
    path = "/timetables/{timetable_id}/resolution/reschedule",
    params(("timetable_id" = Uuid, Path, description = "The timetable.")),
    responses(
        (status = 200, description = "Form values to reopen", body = RescheduleResponse),
        (status = 404, description = "Timetable not found"),
        (status = 409, description = "Nothing is pending")
    )
)]
pub async fn reschedule_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<EditorSession>,
    Path(timetable_id): Path<Uuid>,
) -> Result<Json<RescheduleResponse>, RestError> {
    let workspace = app_state.workspace(timetable_id).await?;
    let mut workspace = workspace.lock().await;

    let (_, editor) = workspace.editing(&session);
    let draft = editor.reschedule()?;
    Ok(Json(RescheduleResponse { draft }))
}
