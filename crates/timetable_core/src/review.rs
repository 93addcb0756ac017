//! crates/timetable_core/src/review.rs
//!
//! The "review" step summarizes every clash that exists among the stored
//! slots of a timetable. It reuses the grid's clash detection.

use crate::domain::{ConflictKind, Slot};
use crate::grid::TimetableGrid;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One clash between two stored slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ClashReport {
    pub kind: ConflictKind,
    pub first: Slot,
    pub second: Slot,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ReviewReport {
    pub timetable_id: Uuid,
    pub slot_count: usize,
    pub clashes: Vec<ClashReport>,
    pub reviewed_at: DateTime<Utc>,
}

impl ReviewReport {
    pub fn is_clean(&self) -> bool {
        self.clashes.is_empty()
    }
}

/// Reviews the whole grid in one go.
pub fn review(timetable_id: Uuid, grid: &TimetableGrid) -> ReviewReport {
    let clashes = grid
        .audit()
        .into_iter()
        .map(|(kind, first, second)| ClashReport {
            kind,
            first: first.clone(),
            second: second.clone(),
            message: grid.describe(kind, first),
        })
        .collect();
    ReviewReport {
        timetable_id,
        slot_count: grid.len(),
        clashes,
        reviewed_at: Utc::now(),
    }
}
