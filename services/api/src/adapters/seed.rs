//! services/api/src/adapters/seed.rs
//!
//! Loads timetable documents from a JSON file at startup.

use crate::error::ApiError;
use serde::Deserialize;
use std::path::Path;
use timetable_core::document::TimetableDocument;
use tracing::info;

/// A seed file holds either one document or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum SeedFile {
    Many(Vec<TimetableDocument>),
    One(TimetableDocument),
}

/// Reads and validates every document in the seed file at `path`.
/// Documents with invalid or clashing slots are rejected.
pub async fn load_documents(path: &Path) -> Result<Vec<TimetableDocument>, ApiError> {
    let raw = tokio::fs::read_to_string(path).await?;
    let documents = parse_documents(&raw)?;
    info!("Loaded {} timetable(s) from {}", documents.len(), path.display());
    Ok(documents)
}

pub fn parse_documents(raw: &str) -> Result<Vec<TimetableDocument>, ApiError> {
    let documents = match serde_json::from_str::<SeedFile>(raw)? {
        SeedFile::Many(documents) => documents,
        SeedFile::One(document) => vec![document],
    };
    for document in &documents {
        document.to_grid()?;
    }
    Ok(documents)
}
