//! crates/timetable_core/src/document.rs
//!
//! The JSON interchange form of a timetable, used for export, import and
//! storage. Its field names must not change.

use crate::domain::{Period, Slot};
use crate::error::GridError;
use crate::grid::TimetableGrid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TimetableDocument {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub periods: Vec<Period>,
    #[serde(default)]
    pub slots: Vec<Slot>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimetableDocument {
    /// A new, empty timetable.
    pub fn new(name: impl Into<String>, periods: Vec<Period>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            periods,
            slots: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Validates every slot and rebuilds the grid. Clashing documents are rejected.
    pub fn to_grid(&self) -> Result<TimetableGrid, GridError> {
        TimetableGrid::from_slots(self.periods.clone(), self.slots.clone())
    }

    /// Copies the grid's current slots into the document and bumps `updated_at`.
    pub fn sync_from(&mut self, grid: &TimetableGrid) {
        self.periods = grid.periods().to_vec();
        self.slots = grid.slots().to_vec();
        self.updated_at = Utc::now();
    }

    pub fn summary(&self) -> TimetableSummary {
        TimetableSummary {
            id: self.id,
            name: self.name.clone(),
            slot_count: self.slots.len(),
            updated_at: self.updated_at,
        }
    }
}

/// A listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct TimetableSummary {
    pub id: Uuid,
    pub name: String,
    pub slot_count: usize,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Day;
    use crate::error::GridError;
    use crate::grid::tests::draft;

    #[test]
    fn export_import_keeps_slots_and_order() {
        let mut doc = TimetableDocument::new("Autumn term", vec![Period::new("1", "First")]);
        let mut grid = doc.to_grid().unwrap();
        grid.insert(draft("Monday", "1", "t1", "c1", "r1", "s1")).unwrap();
        grid.insert(draft("Tuesday", "1", "t1", "c1", "r1", "s2")).unwrap();
        doc.sync_from(&grid);

        let json = serde_json::to_string(&doc).unwrap();
        let back: TimetableDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
        assert_eq!(back.to_grid().unwrap().slots(), grid.slots());
    }

    #[test]
    fn document_field_names_are_stable() {
        let doc = TimetableDocument::new("Spring", Vec::new());
        let json = serde_json::to_value(&doc).unwrap();
        for key in ["id", "name", "periods", "slots", "createdAt", "updatedAt"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn clashing_import_is_rejected() {
        let json = r#"{
            "id": "00000000-0000-0000-0000-000000000001",
            "name": "Broken",
            "slots": [
                {"id":"a","day":"Monday","periodId":"1","subjectId":"s1","teacherId":"t1","roomId":"r1","classId":"c1"},
                {"id":"b","day":"Monday","periodId":"1","subjectId":"s2","teacherId":"t2","roomId":"r1","classId":"c2"}
            ],
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }"#;
        let doc: TimetableDocument = serde_json::from_str(json).unwrap();
        assert!(doc.periods.is_empty());
        assert_eq!(doc.slots[0].day, Day::Monday);
        assert!(matches!(doc.to_grid(), Err(GridError::Clash(_))));
    }

    #[test]
    fn summary_counts_slots() {
        let mut doc = TimetableDocument::new("Summer", Vec::new());
        let mut grid = doc.to_grid().unwrap();
        grid.insert(draft("Monday", "1", "t1", "c1", "r1", "s1")).unwrap();
        doc.sync_from(&grid);
        let summary = doc.summary();
        assert_eq!(summary.slot_count, 1);
        assert_eq!(summary.name, "Summer");
    }
}
