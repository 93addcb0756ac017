//! services/api/src/web/middleware.rs
//!
//! Resolves the editor session for protected routes.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use timetable_core::EditorSession;
use tracing::warn;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Middleware that builds the `EditorSession` from the request headers.
///
/// `x-user-id` must hold a UUID; `x-user-name` is optional. The session is
/// inserted into the request extensions for handlers to use. A missing or
/// malformed id returns 401 Unauthorized.
pub async fn require_editor(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let headers = req.headers();

    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    let user_id = Uuid::parse_str(user_id.trim()).map_err(|_| {
        warn!("Rejected request with malformed {} header.", USER_ID_HEADER);
        StatusCode::UNAUTHORIZED
    })?;

    let display_name = headers
        .get(USER_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map_or_else(|| user_id.to_string(), str::to_string);

    req.extensions_mut()
        .insert(EditorSession::new(user_id, display_name));

    Ok(next.run(req).await)
}
