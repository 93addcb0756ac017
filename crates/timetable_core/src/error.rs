//! crates/timetable_core/src/error.rs
//!
//! Typed failures of grid mutations. Every variant maps to a recovery path on
//! the caller's side; none of them is fatal.

use crate::domain::{Conflict, Slot, SlotId};
use serde::Serialize;
use std::fmt;

//=========================================================================================
// Validation
//=========================================================================================

/// The slot fields a form must fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub enum SlotField {
    Day,
    PeriodId,
    SubjectId,
    TeacherId,
    RoomId,
    ClassId,
}

impl fmt::Display for SlotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlotField::Day => "day",
            SlotField::PeriodId => "periodId",
            SlotField::SubjectId => "subjectId",
            SlotField::TeacherId => "teacherId",
            SlotField::RoomId => "roomId",
            SlotField::ClassId => "classId",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum FieldProblem {
    Missing,
    UnknownDay,
    UnknownPeriod,
}

/// One field-level complaint, suitable for showing next to the form input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct FieldIssue {
    pub field: SlotField,
    pub problem: FieldProblem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.problem, &self.value) {
            (FieldProblem::Missing, _) => write!(f, "{} is required", self.field),
            (FieldProblem::UnknownDay, Some(v)) => write!(f, "'{v}' is not a day of the week"),
            (FieldProblem::UnknownPeriod, Some(v)) => write!(f, "period '{v}' does not exist"),
            (_, None) => write!(f, "{} is invalid", self.field),
        }
    }
}

/// All problems found in one slot form. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[error("invalid slot: {}", summarize(.issues))]
pub struct ValidationError {
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn fields(&self) -> impl Iterator<Item = SlotField> + '_ {
        self.issues.iter().map(|issue| issue.field)
    }
}

fn summarize(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

//=========================================================================================
// Clashes
//=========================================================================================

/// The candidate would break the no-clash invariant. `conflicts` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[error("slot clashes with {} existing assignment(s)", .conflicts.len())]
pub struct ClashError {
    pub candidate: Slot,
    pub conflicts: Vec<Conflict>,
}

//=========================================================================================
// Grid and Resolution Errors
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Clash(#[from] ClashError),
    #[error("Slot {0} not found")]
    UnknownSlot(SlotId),
    #[error("Slot {0} already exists")]
    DuplicateSlot(SlotId),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("There is no pending conflict to resolve")]
    NothingPending,
    #[error(transparent)]
    Grid(#[from] GridError),
}
