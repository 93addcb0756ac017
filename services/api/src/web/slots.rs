//! services/api/src/web/slots.rs
//!
//! Handlers for reading and mutating the slots of one timetable. Every
//! mutation holds the timetable's workspace lock from clash check to commit.

use crate::web::{response::RestError, state::AppState};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::Deserialize;
use std::sync::Arc;
use timetable_core::{Conflict, Day, EditorSession, Slot, SlotDraft, SlotFilter, SlotId};
use tracing::info;
use utoipa::IntoParams;
use uuid::Uuid;

/// Filters for listing slots. Giving `day`, `periodId` and `classId`
/// together looks up a single cell.
#[derive(Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    pub day: Option<String>,
    pub period_id: Option<String>,
    pub class_id: Option<String>,
    pub teacher_id: Option<String>,
    pub room_id: Option<String>,
}

impl SlotQuery {
    fn into_filter(self) -> Result<SlotFilter, RestError> {
        let day = self
            .day
            .map(|raw| raw.parse::<Day>())
            .transpose()
            .map_err(|e| RestError::BadRequest(e.to_string()))?;
        Ok(SlotFilter {
            day,
            period_id: self.period_id,
            class_id: self.class_id,
            teacher_id: self.teacher_id,
            room_id: self.room_id,
        })
    }
}

/// List the slots of a timetable, ordered by day and period.
#[utoipa::path(
    get,
    path = "/timetables/{timetable_id}/slots",
    params(("timetable_id" = Uuid, Path, description = "The timetable."), SlotQuery),
    responses(
        (status = 200, description = "Matching slots", body = Vec<Slot>),
        (status = 400, description = "Unknown day name"),
        (status = 404, description = "Timetable not found")
    )
)]
pub async fn list_slots_handler(
    State(app_state): State<Arc<AppState>>,
    Path(timetable_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Vec<Slot>>, RestError> {
    let filter = query.into_filter()?;
    let workspace = app_state.workspace(timetable_id).await?;
    let workspace = workspace.lock().await;

    let slots = match (&filter.day, &filter.period_id, &filter.class_id) {
        (Some(day), Some(period_id), Some(class_id)) => workspace
            .grid
            .slot_at(*day, period_id, class_id)
            .filter(|slot| filter.matches(slot))
            .into_iter()
            .cloned()
            .collect(),
        _ => workspace.grid.find(&filter).into_iter().cloned().collect(),
    };
    Ok(Json(slots))
}

/// Check a slot form for clashes without storing anything.
#[utoipa::path(
    post,
    path = "/timetables/{timetable_id}/clashes",
    request_body = SlotDraft,
    params(("timetable_id" = Uuid, Path, description = "The timetable.")),
    responses(
        (status = 200, description = "Conflicts; empty means safe to commit", body = Vec<Conflict>),
        (status = 404, description = "Timetable not found"),
        (status = 422, description = "Missing or invalid fields", body = crate::web::response::ValidationResponse)
    )
)]
pub async fn find_clashes_handler(
    State(app_state): State<Arc<AppState>>,
    Path(timetable_id): Path<Uuid>,
    Json(draft): Json<SlotDraft>,
) -> Result<Json<Vec<Conflict>>, RestError> {
    let workspace = app_state.workspace(timetable_id).await?;
    let workspace = workspace.lock().await;
    let candidate = workspace.grid.validate(&draft)?;
    Ok(Json(workspace.grid.find_clashes(&candidate)))
}

/// Schedule a new slot.
#[utoipa::path(
    post,
    path = "/timetables/{timetable_id}/slots",
    request_body = SlotDraft,
    params(("timetable_id" = Uuid, Path, description = "The timetable.")),
    responses(
        (status = 201, description = "Slot stored", body = Slot),
        (status = 404, description = "Timetable not found"),
        (status = 409, description = "The slot clashes", body = crate::web::response::ClashResponse),
        (status = 422, description = "Missing or invalid fields", body = crate::web::response::ValidationResponse)
    )
)]
pub async fn insert_slot_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<EditorSession>,
    Path(timetable_id): Path<Uuid>,
    Json(draft): Json<SlotDraft>,
) -> Result<impl IntoResponse, RestError> {
    let workspace = app_state.workspace(timetable_id).await?;
    let mut workspace = workspace.lock().await;

    let (grid, editor) = workspace.editing(&session);
    let slot = editor.submit_insert(grid, draft)?;
    app_state.commit(&mut workspace).await?;

    info!("{} scheduled slot {} in timetable {}", session.display_name, slot.id, timetable_id);
    Ok((StatusCode::CREATED, Json(slot)))
}

/// Change an existing slot in place.
#[utoipa::path(
    put,
    path = "/timetables/{timetable_id}/slots/{slot_id}",
    request_body = SlotDraft,
    params(
        ("timetable_id" = Uuid, Path, description = "The timetable."),
        ("slot_id" = String, Path, description = "The slot to change.")
    ),
    responses(
        (status = 200, description = "Slot updated", body = Slot),
        (status = 404, description = "Timetable or slot not found"),
        (status = 409, description = "The slot clashes", body = crate::web::response::ClashResponse),
        (status = 422, description = "Missing or invalid fields", body = crate::web::response::ValidationResponse)
    )
)]
pub async fn update_slot_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<EditorSession>,
    Path((timetable_id, slot_id)): Path<(Uuid, String)>,
    Json(draft): Json<SlotDraft>,
) -> Result<Json<Slot>, RestError> {
    let workspace = app_state.workspace(timetable_id).await?;
    let mut workspace = workspace.lock().await;

    let (grid, editor) = workspace.editing(&session);
    let slot = editor.submit_update(grid, &SlotId::new(slot_id), draft)?;
    app_state.commit(&mut workspace).await?;

    info!("{} moved slot {} in timetable {}", session.display_name, slot.id, timetable_id);
    Ok(Json(slot))
}

/// Delete a slot. Deleting a slot that does not exist succeeds.
#[utoipa::path(
    delete,
    path = "/timetables/{timetable_id}/slots/{slot_id}",
    params(
        ("timetable_id" = Uuid, Path, description = "The timetable."),
        ("slot_id" = String, Path, description = "The slot to delete.")
    ),
    responses(
        (status = 204, description = "Slot is gone"),
        (status = 404, description = "Timetable not found")
    )
)]
pub async fn remove_slot_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session): Extension<EditorSession>,
    Path((timetable_id, slot_id)): Path<(Uuid, String)>,
) -> Result<StatusCode, RestError> {
    let workspace = app_state.workspace(timetable_id).await?;
    let mut workspace = workspace.lock().await;

    if let Some(slot) = workspace.grid.remove(&SlotId::new(slot_id)) {
        app_state.commit(&mut workspace).await?;
        info!("{} removed slot {} from timetable {}", session.display_name, slot.id, timetable_id);
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_with_unknown_day_is_a_bad_request() {
        let query = SlotQuery {
            day: Some("Blursday".to_string()),
            ..SlotQuery::default()
        };
        assert!(matches!(query.into_filter(), Err(RestError::BadRequest(_))));
    }

    #[test]
    fn query_maps_onto_filter() {
        let query = SlotQuery {
            day: Some("tuesday".to_string()),
            class_id: Some("c1".to_string()),
            ..SlotQuery::default()
        };
        let filter = query.into_filter().unwrap();
        assert_eq!(filter.day, Some(Day::Tuesday));
        assert_eq!(filter.class_id.as_deref(), Some("c1"));
        assert!(filter.teacher_id.is_none());
    }
}
