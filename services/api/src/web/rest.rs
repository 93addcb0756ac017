//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for whole timetables (listing, creation,
//! import/export, deletion) and the master definition of the OpenAPI
//! document.

use crate::web::{
    protocol::ServerMessage,
    resolution::{self, RescheduleResponse},
    response::{ClashResponse, ErrorResponse, RestError, ValidationResponse},
    review_task, slots,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::Deserialize;
use std::sync::Arc;
use timetable_core::{
    ClashReport, Conflict, ConflictKind, Day, EditorSession, FieldIssue, FieldProblem, Period,
    ResolutionState, ReviewReport, Slot, SlotDraft, SlotField, SlotId, TimetableDocument,
    TimetableSummary,
};
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_timetables_handler,
        create_timetable_handler,
        import_timetable_handler,
        export_timetable_handler,
        delete_timetable_handler,
        slots::list_slots_handler,
        slots::find_clashes_handler,
        slots::insert_slot_handler,
        slots::update_slot_handler,
        slots::remove_slot_handler,
        resolution::resolution_state_handler,
        resolution::cancel_handler,
        resolution::replace_handler,
        resolution::reschedule_handler,
        review_task::start_review_handler,
        review_task::last_review_handler,
    ),
    components(
        schemas(
            CreateTimetableRequest, TimetableDocument, TimetableSummary, Period, Slot, SlotId,
            SlotDraft, Day, Conflict, ConflictKind, FieldIssue, FieldProblem, SlotField,
            ResolutionState, RescheduleResponse, ReviewReport, ClashReport, ErrorResponse,
            ValidationResponse, ClashResponse
        )
    ),
    tags(
        (name = "Timetable API", description = "Endpoints for editing weekly timetables with clash detection.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Payload Structs
//=========================================================================================

/// The payload for creating an empty timetable.
#[derive(Deserialize, ToSchema)]
pub struct CreateTimetableRequest {
    pub name: String,
    #[serde(default)]
    pub periods: Vec<Period>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every timetable.
#[utoipa::path(
    get,
    path = "/timetables",
    responses((status = 200, description = "All timetables", body = Vec<TimetableSummary>))
)]
pub async fn list_timetables_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<TimetableSummary>>, RestError> {
    Ok(Json(app_state.repo.list_timetables().await?))
}

/// Create an empty timetable.
#[utoipa::path(
    post,
    path = "/timetables",
    request_body = CreateTimetableRequest,
    responses(
        (status = 201, description = "Timetable created", body = TimetableDocument),
        (status = 400, description = "Missing name or duplicate period ids")
    )
)]
pub async fn create_timetable_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<EditorSession>,
    Json(req): Json<CreateTimetableRequest>,
) -> Result<impl IntoResponse, RestError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(RestError::BadRequest("name is required".to_string()));
    }
    check_periods(&req.periods)?;

    let document = TimetableDocument::new(name, req.periods);
    app_state.repo.save_timetable(&document).await?;
    info!("{} created timetable {} ({})", session.display_name, document.id, document.name);
    Ok((StatusCode::CREATED, Json(document)))
}

/// Import a timetable document, replacing any timetable with the same id.
#[utoipa::path(
    post,
    path = "/timetables/import",
    request_body = TimetableDocument,
    responses(
        (status = 201, description = "Timetable imported", body = TimetableSummary),
        (status = 400, description = "Duplicate period ids"),
        (status = 409, description = "The document's slots clash", body = ClashResponse),
        (status = 422, description = "A slot has missing or invalid fields", body = ValidationResponse)
    )
)]
pub async fn import_timetable_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<EditorSession>,
    Json(document): Json<TimetableDocument>,
) -> Result<impl IntoResponse, RestError> {
    check_periods(&document.periods)?;
    document.to_grid()?;

    app_state.replace_timetable(&document).await?;
    info!(
        "{} imported timetable {} with {} slot(s)",
        session.display_name,
        document.id,
        document.slots.len()
    );
    Ok((StatusCode::CREATED, Json(document.summary())))
}

/// Export a timetable as its JSON document.
#[utoipa::path(
    get,
    path = "/timetables/{timetable_id}",
    params(("timetable_id" = Uuid, Path, description = "The timetable.")),
    responses(
        (status = 200, description = "The timetable document", body = TimetableDocument),
        (status = 404, description = "Timetable not found")
    )
)]
pub async fn export_timetable_handler(
    State(app_state): State<Arc<AppState>>,
    Path(timetable_id): Path<Uuid>,
) -> Result<Json<TimetableDocument>, RestError> {
    let workspace = app_state.workspace(timetable_id).await?;
    let workspace = workspace.lock().await;
    Ok(Json(workspace.document.clone()))
}

/// Delete a timetable and everything scheduled in it.
#[utoipa::path(
    delete,
    path = "/timetables/{timetable_id}",
    params(("timetable_id" = Uuid, Path, description = "The timetable.")),
    responses(
        (status = 204, description = "Timetable deleted"),
        (status = 404, description = "Timetable not found")
    )
)]
pub async fn delete_timetable_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<EditorSession>,
    Path(timetable_id): Path<Uuid>,
) -> Result<StatusCode, RestError> {
    app_state.delete_timetable(timetable_id).await?;
    app_state.publish(ServerMessage::TimetableDeleted { timetable_id });
    info!("{} deleted timetable {}", session.display_name, timetable_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Period ids must be non-empty and unique within one timetable.
fn check_periods(periods: &[Period]) -> Result<(), RestError> {
    for (i, period) in periods.iter().enumerate() {
        if period.id.trim().is_empty() {
            return Err(RestError::BadRequest("period id is required".to_string()));
        }
        if periods[..i].iter().any(|earlier| earlier.id == period.id) {
            return Err(RestError::BadRequest(format!("period '{}' is listed twice", period.id)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_period_ids_are_rejected() {
        let periods = vec![Period::new("1", "First"), Period::new("1", "Again")];
        assert!(matches!(check_periods(&periods), Err(RestError::BadRequest(_))));
        assert!(check_periods(&periods[..1]).is_ok());
        assert!(matches!(
            check_periods(&[Period::new(" ", "Blank")]),
            Err(RestError::BadRequest(_))
        ));
    }
}
