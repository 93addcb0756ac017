//! crates/timetable_core/src/ports.rs
//!
//! Service contracts the core needs from the outside world. Storage backends
//! implement these; the core never depends on a concrete one.

use crate::document::{TimetableDocument, TimetableSummary};
use async_trait::async_trait;
use uuid::Uuid;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait TimetableRepository: Send + Sync {
    async fn list_timetables(&self) -> PortResult<Vec<TimetableSummary>>;

    async fn load_timetable(&self, timetable_id: Uuid) -> PortResult<TimetableDocument>;

    /// Creates or overwrites the stored document with the same id.
    async fn save_timetable(&self, document: &TimetableDocument) -> PortResult<()>;

    async fn delete_timetable(&self, timetable_id: Uuid) -> PortResult<()>;
}
