//! services/api/src/adapters/memory.rs
//!
//! An in-memory implementation of the `TimetableRepository` port. Documents
//! live for as long as the process does.

use async_trait::async_trait;
use std::collections::HashMap;
use timetable_core::document::{TimetableDocument, TimetableSummary};
use timetable_core::ports::{PortError, PortResult, TimetableRepository};
use tokio::sync::RwLock;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A repository adapter that keeps every document in a map.
#[derive(Default)]
pub struct MemoryRepository {
    documents: RwLock<HashMap<Uuid, TimetableDocument>>,
}

impl MemoryRepository {
    /// Creates an empty `MemoryRepository`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-filled with `documents`.
    pub fn with_documents(documents: impl IntoIterator<Item = TimetableDocument>) -> Self {
        let documents = documents.into_iter().map(|doc| (doc.id, doc)).collect();
        Self {
            documents: RwLock::new(documents),
        }
    }
}

//=========================================================================================
// `TimetableRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl TimetableRepository for MemoryRepository {
    async fn list_timetables(&self) -> PortResult<Vec<TimetableSummary>> {
        let documents = self.documents.read().await;
        let mut summaries: Vec<_> = documents.values().map(TimetableDocument::summary).collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(summaries)
    }

    async fn load_timetable(&self, timetable_id: Uuid) -> PortResult<TimetableDocument> {
        self.documents
            .read()
            .await
            .get(&timetable_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Timetable {} not found", timetable_id)))
    }

    async fn save_timetable(&self, document: &TimetableDocument) -> PortResult<()> {
        self.documents
            .write()
            .await
            .insert(document.id, document.clone());
        Ok(())
    }

    async fn delete_timetable(&self, timetable_id: Uuid) -> PortResult<()> {
        self.documents
            .write()
            .await
            .remove(&timetable_id)
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("Timetable {} not found", timetable_id)))
    }
}
