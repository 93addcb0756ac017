pub mod middleware;
pub mod protocol;
pub mod resolution;
pub mod response;
pub mod rest;
pub mod review_task;
pub mod slots;
pub mod state;
pub mod ws_handler;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

pub use middleware::require_editor;
pub use state::AppState;
pub use ws_handler::ws_handler;

/// Builds every API route. CORS and the Swagger UI are layered on by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    let editing_routes = Router::new()
        .route(
            "/timetables",
            get(rest::list_timetables_handler).post(rest::create_timetable_handler),
        )
        .route("/timetables/import", post(rest::import_timetable_handler))
        .route(
            "/timetables/{timetable_id}",
            get(rest::export_timetable_handler).delete(rest::delete_timetable_handler),
        )
        .route(
            "/timetables/{timetable_id}/slots",
            get(slots::list_slots_handler).post(slots::insert_slot_handler),
        )
        .route(
            "/timetables/{timetable_id}/slots/{slot_id}",
            put(slots::update_slot_handler).delete(slots::remove_slot_handler),
        )
        .route("/timetables/{timetable_id}/clashes", post(slots::find_clashes_handler))
        .route(
            "/timetables/{timetable_id}/resolution",
            get(resolution::resolution_state_handler),
        )
        .route(
            "/timetables/{timetable_id}/resolution/cancel",
            post(resolution::cancel_handler),
        )
        .route(
            "/timetables/{timetable_id}/resolution/replace",
            post(resolution::replace_handler),
        )
        .route(
            "/timetables/{timetable_id}/resolution/reschedule",
            post(resolution::reschedule_handler),
        )
        .route(
            "/timetables/{timetable_id}/review",
            get(review_task::last_review_handler).post(review_task::start_review_handler),
        )
        .layer(axum_middleware::from_fn(require_editor));

    // Browsers cannot set custom headers on WebSocket upgrades; the event
    // stream is read-only.
    Router::new()
        .route("/ws", get(ws_handler))
        .merge(editing_routes)
        .with_state(app_state)
}
