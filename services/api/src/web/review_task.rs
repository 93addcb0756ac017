//! services/api/src/web/review_task.rs
//!
//! The asynchronous "review" worker. It checks a snapshot of a timetable for
//! clashes off the request path and reports the result over the event
//! channel. A newer review request for the same timetable cancels the older one.

use crate::web::{
    protocol::ServerMessage,
    response::RestError,
    state::{AppState, Workspace},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use std::sync::Arc;
use timetable_core::{review, PortError, PortResult, ReviewReport};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Starts a review of `timetable_id`, cancelling any review still running for it.
pub async fn start_review(app_state: Arc<AppState>, timetable_id: Uuid) -> PortResult<()> {
    let workspace = app_state.workspace(timetable_id).await?;

    let token = {
        let mut reviews = app_state.reviews.lock().await;
        let tracker = reviews.entry(timetable_id).or_default();
        tracker.token.cancel();
        tracker.token = CancellationToken::new();
        tracker.token.clone()
    };

    tokio::spawn(async move {
        if let Err(e) = review_process(app_state, workspace, timetable_id, token).await {
            error!("Review of timetable {} failed: {:?}", timetable_id, e);
        }
    });
    Ok(())
}

/// The review worker. Returns `None` when it was cancelled before finishing.
pub async fn review_process(
    app_state: Arc<AppState>,
    workspace: Arc<Mutex<Workspace>>,
    timetable_id: Uuid,
    cancellation_token: CancellationToken,
) -> PortResult<Option<ReviewReport>> {
    info!("Review of timetable {} started.", timetable_id);
    app_state.publish(ServerMessage::ReviewStarted { timetable_id });

    let grid = workspace.lock().await.grid.clone();
    let work = tokio::task::spawn_blocking(move || review(timetable_id, &grid));

    let report = tokio::select! {
        _ = cancellation_token.cancelled() => None,
        joined = work => Some(joined.map_err(|e| PortError::Unexpected(e.to_string()))?),
    };

    let report = {
        let mut reviews = app_state.reviews.lock().await;
        match (report, reviews.get_mut(&timetable_id)) {
            (Some(report), Some(tracker)) if !cancellation_token.is_cancelled() => {
                tracker.last_report = Some(report.clone());
                Some(report)
            }
            _ => None,
        }
    };

    match &report {
        Some(report) => {
            info!(
                "Review of timetable {} finished with {} clash(es).",
                timetable_id,
                report.clashes.len()
            );
            app_state.publish(ServerMessage::ReviewCompleted {
                timetable_id,
                report: report.clone(),
            });
        }
        None => {
            info!("Review of timetable {} cancelled.", timetable_id);
            app_state.publish(ServerMessage::ReviewCancelled { timetable_id });
        }
    }
    Ok(report)
}

//=========================================================================================
// REST Handlers
//=========================================================================================

/// Start checking the whole timetable for clashes. Progress arrives over `/ws`.
#[utoipa::path(
    post,
    path = "/timetables/{timetable_id}/review",
    params(("timetable_id" = Uuid, Path, description = "The timetable.")),
    responses(
        (status = 202, description = "Review started"),
        (status = 404, description = "Timetable not found")
    )
)]
pub async fn start_review_handler(
    State(app_state): State<Arc<AppState>>,
    Path(timetable_id): Path<Uuid>,
) -> Result<StatusCode, RestError> {
    start_review(app_state, timetable_id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// The most recent completed review.
#[utoipa::path(
    get,
    path = "/timetables/{timetable_id}/review",
    params(("timetable_id" = Uuid, Path, description = "The timetable.")),
    responses(
        (status = 200, description = "Latest report", body = ReviewReport),
        (status = 404, description = "No review has completed yet")
    )
)]
pub async fn last_review_handler(
    State(app_state): State<Arc<AppState>>,
    Path(timetable_id): Path<Uuid>,
) -> Result<Json<ReviewReport>, RestError> {
    app_state
        .reviews
        .lock()
        .await
        .get(&timetable_id)
        .and_then(|tracker| tracker.last_report.clone())
        .map(Json)
        .ok_or_else(|| RestError::NotFound(format!("No review of timetable {} yet", timetable_id)))
}
