//! crates/timetable_core/src/grid.rs
//!
//! `TimetableGrid` owns the slot set of one timetable and routes every
//! mutation through clash detection, so the stored slots never clash.

use crate::domain::{Conflict, ConflictKind, Day, Period, Slot, SlotDraft, SlotId};
use crate::error::{ClashError, FieldIssue, FieldProblem, GridError, SlotField, ValidationError};
use serde::Serialize;
use std::cmp::Ordering;
use tracing::debug;

//=========================================================================================
// Events
//=========================================================================================

/// Raised by every successful mutation so collaborators can persist and re-render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GridEvent {
    SlotAdded { slot: Slot },
    SlotUpdated { slot: Slot },
    SlotRemoved { slot_id: SlotId },
}

//=========================================================================================
// Queries
//=========================================================================================

/// Criteria for [`TimetableGrid::find`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotFilter {
    pub day: Option<Day>,
    pub period_id: Option<String>,
    pub class_id: Option<String>,
    pub teacher_id: Option<String>,
    pub room_id: Option<String>,
}

impl SlotFilter {
    pub fn matches(&self, slot: &Slot) -> bool {
        fn same(wanted: &Option<String>, actual: &str) -> bool {
            wanted.as_deref().map_or(true, |wanted| wanted == actual)
        }
        self.day.map_or(true, |day| day == slot.day)
            && same(&self.period_id, &slot.period_id)
            && same(&self.class_id, &slot.class_id)
            && same(&self.teacher_id, &slot.teacher_id)
            && same(&self.room_id, &slot.room_id)
    }
}

//=========================================================================================
// TimetableGrid
//=========================================================================================

#[derive(Debug, Clone, Default)]
pub struct TimetableGrid {
    periods: Vec<Period>,
    slots: Vec<Slot>,
    events: Vec<GridEvent>,
}

impl TimetableGrid {
    /// An empty grid that accepts any period id.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty grid whose slots must reference one of `periods`.
    pub fn with_periods(periods: Vec<Period>) -> Self {
        Self {
            periods,
            ..Self::default()
        }
    }

    /// Builds a grid from previously stored slots, rejecting any slot that is
    /// invalid or clashes with one before it. No events are raised.
    pub fn from_slots(periods: Vec<Period>, slots: Vec<Slot>) -> Result<Self, GridError> {
        let mut grid = Self::with_periods(periods);
        for stored in slots {
            let slot = grid.validate(&SlotDraft::from(&stored))?;
            if grid.get(&slot.id).is_some() {
                return Err(GridError::DuplicateSlot(slot.id));
            }
            let conflicts = grid.find_clashes(&slot);
            if !conflicts.is_empty() {
                return Err(ClashError {
                    candidate: slot,
                    conflicts,
                }
                .into());
            }
            grid.slots.push(slot);
        }
        Ok(grid)
    }

    //-------------------------------------------------------------------------------------
    // Queries
    //-------------------------------------------------------------------------------------

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    /// Stored slots in storage order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: &SlotId) -> Option<&Slot> {
        self.slots.iter().find(|slot| &slot.id == id)
    }

    /// What occupies the cell of `class_id` at (`day`, `period_id`).
    pub fn slot_at(&self, day: Day, period_id: &str, class_id: &str) -> Option<&Slot> {
        self.slots
            .iter()
            .find(|slot| slot.day == day && slot.period_id == period_id && slot.class_id == class_id)
    }

    /// Slots matching `filter`, ordered by day and period.
    pub fn find(&self, filter: &SlotFilter) -> Vec<&Slot> {
        self.sorted(|slot| filter.matches(slot))
    }

    pub fn slots_for_class(&self, class_id: &str) -> Vec<&Slot> {
        self.sorted(|slot| slot.class_id == class_id)
    }

    pub fn slots_for_teacher(&self, teacher_id: &str) -> Vec<&Slot> {
        self.sorted(|slot| slot.teacher_id == teacher_id)
    }

    pub fn slots_for_room(&self, room_id: &str) -> Vec<&Slot> {
        self.sorted(|slot| slot.room_id == room_id)
    }

    pub fn slots_on(&self, day: Day) -> Vec<&Slot> {
        self.sorted(|slot| slot.day == day)
    }

    /// Matching slots ordered by day, then by position in the period list.
    /// Periods missing from the list sort after known ones, by id.
    fn sorted(&self, keep: impl Fn(&Slot) -> bool) -> Vec<&Slot> {
        let mut found: Vec<&Slot> = self.slots.iter().filter(|slot| keep(slot)).collect();
        found.sort_by(|a, b| {
            a.day
                .cmp(&b.day)
                .then_with(|| self.compare_periods(&a.period_id, &b.period_id))
        });
        found
    }

    fn compare_periods(&self, a: &str, b: &str) -> Ordering {
        match (self.period_position(a), self.period_position(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }

    fn period_position(&self, period_id: &str) -> Option<usize> {
        self.periods.iter().position(|period| period.id == period_id)
    }

    fn period_label<'a>(&'a self, period_id: &'a str) -> &'a str {
        self.periods
            .iter()
            .find(|period| period.id == period_id)
            .map_or(period_id, |period| period.label.as_str())
    }

    //-------------------------------------------------------------------------------------
    // Clash Detection
    //-------------------------------------------------------------------------------------

    /// Every conflict `candidate` would have with the stored slots, excluding
    /// the stored slot with the candidate's own id. Teacher clashes come
    /// first, then class, then room; each group in storage order.
    pub fn find_clashes(&self, candidate: &Slot) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        for kind in ConflictKind::ALL {
            for existing in &self.slots {
                if existing.id != candidate.id && kind.collides(candidate, existing) {
                    conflicts.push(Conflict {
                        kind,
                        existing: existing.clone(),
                        message: self.describe(kind, existing),
                    });
                }
            }
        }
        conflicts
    }

    /// Every clash among the stored slots themselves, one entry per
    /// unordered pair and kind. Empty for any grid built through this API.
    pub fn audit(&self) -> Vec<(ConflictKind, &Slot, &Slot)> {
        let mut found = Vec::new();
        for kind in ConflictKind::ALL {
            for (i, first) in self.slots.iter().enumerate() {
                for second in &self.slots[i + 1..] {
                    if kind.collides(first, second) {
                        found.push((kind, first, second));
                    }
                }
            }
        }
        found
    }

    pub(crate) fn describe(&self, kind: ConflictKind, existing: &Slot) -> String {
        format!(
            "{kind} {} is already booked on {}, {} (slot {})",
            kind.resource_of(existing),
            existing.day,
            self.period_label(&existing.period_id),
            existing.id
        )
    }

    //-------------------------------------------------------------------------------------
    // Validation
    //-------------------------------------------------------------------------------------

    /// Checks that every required field is filled in and that day and period
    /// refer to something real. All problems are reported together.
    pub fn validate(&self, draft: &SlotDraft) -> Result<Slot, ValidationError> {
        let mut issues = Vec::new();
        let mut required = |field: SlotField, value: &str| {
            if value.trim().is_empty() {
                issues.push(FieldIssue {
                    field,
                    problem: FieldProblem::Missing,
                    value: None,
                });
            }
        };
        required(SlotField::Day, &draft.day);
        required(SlotField::PeriodId, &draft.period_id);
        required(SlotField::SubjectId, &draft.subject_id);
        required(SlotField::TeacherId, &draft.teacher_id);
        required(SlotField::RoomId, &draft.room_id);
        required(SlotField::ClassId, &draft.class_id);

        let day = if draft.day.trim().is_empty() {
            None
        } else {
            match draft.day.parse::<Day>() {
                Ok(day) => Some(day),
                Err(_) => {
                    issues.push(FieldIssue {
                        field: SlotField::Day,
                        problem: FieldProblem::UnknownDay,
                        value: Some(draft.day.clone()),
                    });
                    None
                }
            }
        };

        let period_id = draft.period_id.trim();
        if !period_id.is_empty() && !self.periods.is_empty() && self.period_position(period_id).is_none() {
            issues.push(FieldIssue {
                field: SlotField::PeriodId,
                problem: FieldProblem::UnknownPeriod,
                value: Some(period_id.to_string()),
            });
        }

        match day {
            Some(day) if issues.is_empty() => Ok(Slot {
                id: draft
                    .id
                    .clone()
                    .filter(|id| !id.as_str().trim().is_empty())
                    .unwrap_or_else(SlotId::generate),
                day,
                period_id: period_id.to_string(),
                subject_id: draft.subject_id.trim().to_string(),
                teacher_id: draft.teacher_id.trim().to_string(),
                room_id: draft.room_id.trim().to_string(),
                class_id: draft.class_id.trim().to_string(),
            }),
            _ => Err(ValidationError { issues }),
        }
    }

    //-------------------------------------------------------------------------------------
    // Mutations
    //-------------------------------------------------------------------------------------

    /// Validates `draft`, checks it for clashes and appends it. A fresh id is
    /// assigned when the draft has none.
    pub fn insert(&mut self, draft: SlotDraft) -> Result<Slot, GridError> {
        let candidate = self.validate(&draft)?;
        if self.get(&candidate.id).is_some() {
            return Err(GridError::DuplicateSlot(candidate.id));
        }
        self.check(candidate.clone())?;
        debug!(slot_id = %candidate.id, "Slot inserted.");
        self.slots.push(candidate.clone());
        self.events.push(GridEvent::SlotAdded {
            slot: candidate.clone(),
        });
        Ok(candidate)
    }

    /// Replaces the slot `id` in place with `draft`'s values. The slot is
    /// never compared against itself.
    pub fn update(&mut self, id: &SlotId, draft: SlotDraft) -> Result<Slot, GridError> {
        let index = self.index_of(id).ok_or_else(|| GridError::UnknownSlot(id.clone()))?;
        let candidate = self.validate(&SlotDraft {
            id: Some(id.clone()),
            ..draft
        })?;
        self.check(candidate.clone())?;
        debug!(slot_id = %id, "Slot updated.");
        self.slots[index] = candidate.clone();
        self.events.push(GridEvent::SlotUpdated {
            slot: candidate.clone(),
        });
        Ok(candidate)
    }

    /// Removes the slot `id`. Absent ids are ignored.
    pub fn remove(&mut self, id: &SlotId) -> Option<Slot> {
        let index = self.index_of(id)?;
        let removed = self.slots.remove(index);
        debug!(slot_id = %id, "Slot removed.");
        self.events.push(GridEvent::SlotRemoved { slot_id: id.clone() });
        Some(removed)
    }

    /// Stores `slot` without a clash check: in place when its id is already
    /// stored, appended otherwise. Callers must have cleared every collision.
    pub(crate) fn commit_unchecked(&mut self, slot: Slot) {
        match self.index_of(&slot.id) {
            Some(index) => {
                self.slots[index] = slot.clone();
                self.events.push(GridEvent::SlotUpdated { slot });
            }
            None => {
                self.slots.push(slot.clone());
                self.events.push(GridEvent::SlotAdded { slot });
            }
        }
    }

    pub fn has_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Drains the events raised since the previous call.
    pub fn take_events(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    fn check(&self, candidate: Slot) -> Result<(), ClashError> {
        let conflicts = self.find_clashes(&candidate);
        if conflicts.is_empty() {
            return Ok(());
        }
        debug!(
            slot_id = %candidate.id,
            conflicts = conflicts.len(),
            "Slot rejected because of clashes."
        );
        Err(ClashError { candidate, conflicts })
    }

    fn index_of(&self, id: &SlotId) -> Option<usize> {
        self.slots.iter().position(|slot| &slot.id == id)
    }
}
