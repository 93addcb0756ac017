//! crates/timetable_core/src/resolution.rs
//!
//! The cancel / replace / reschedule protocol an editor walks through when a
//! submitted slot clashes with the grid.

use crate::domain::{Conflict, Slot, SlotDraft, SlotId};
use crate::error::{ClashError, GridError, ResolutionError};
use crate::grid::TimetableGrid;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

/// Where an editor currently stands.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResolutionState {
    #[default]
    Idle,
    PendingConflict {
        candidate: Slot,
        conflicts: Vec<Conflict>,
    },
    Committed {
        slot: Slot,
    },
}

/// Drives one editor's submissions against a grid.
#[derive(Debug, Clone, Default)]
pub struct SlotEditor {
    state: ResolutionState,
    /// The pending candidate replaces a stored slot rather than adding one.
    updating: bool,
}

impl SlotEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ResolutionState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, ResolutionState::PendingConflict { .. })
    }

    /// Inserts `draft`. A clash leaves the editor waiting for a decision; any
    /// earlier pending candidate is dropped.
    pub fn submit_insert(&mut self, grid: &mut TimetableGrid, draft: SlotDraft) -> Result<Slot, GridError> {
        let outcome = grid.insert(draft);
        self.settle(outcome, false)
    }

    /// Updates slot `id` with `draft`, with the same clash handling as inserts.
    pub fn submit_update(
        &mut self,
        grid: &mut TimetableGrid,
        id: &SlotId,
        draft: SlotDraft,
    ) -> Result<Slot, GridError> {
        let outcome = grid.update(id, draft);
        self.settle(outcome, true)
    }

    fn settle(&mut self, outcome: Result<Slot, GridError>, updating: bool) -> Result<Slot, GridError> {
        if self.is_pending() {
            debug!("Pending candidate superseded by a new submission.");
        }
        match &outcome {
            Err(GridError::Clash(clash)) => {
                self.state = ResolutionState::PendingConflict {
                    candidate: clash.candidate.clone(),
                    conflicts: clash.conflicts.clone(),
                };
                self.updating = updating;
            }
            _ => {
                self.state = ResolutionState::Idle;
                self.updating = false;
            }
        }
        outcome
    }

    /// Drops the pending candidate. The grid is untouched.
    pub fn cancel(&mut self) -> Result<(), ResolutionError> {
        self.take_pending()?;
        debug!("Pending candidate cancelled.");
        Ok(())
    }

    /// Removes the stored slots the candidate still collides with and commits
    /// the candidate in their place. Only slots named by the pending conflicts
    /// are ever removed; one that has since moved away is kept.
    ///
    /// If the grid gained other colliding slots after the conflicts were
    /// reported, nothing is removed: the pending conflicts are refreshed and
    /// returned as a clash so the editor can decide again. A pending update
    /// whose slot has been deleted meanwhile fails with `UnknownSlot`.
    pub fn replace(&mut self, grid: &mut TimetableGrid) -> Result<Slot, ResolutionError> {
        let (candidate, conflicts) = self.take_pending()?;
        let updating = std::mem::take(&mut self.updating);
        match (updating, grid.get(&candidate.id).is_some()) {
            (true, false) => {
                debug!(slot_id = %candidate.id, "Slot under update was deleted meanwhile.");
                return Err(GridError::UnknownSlot(candidate.id).into());
            }
            (false, true) => return Err(GridError::DuplicateSlot(candidate.id).into()),
            _ => {}
        }
        let approved: HashSet<&SlotId> = conflicts.iter().map(|c| &c.existing.id).collect();

        let current = grid.find_clashes(&candidate);
        if current.iter().any(|c| !approved.contains(&c.existing.id)) {
            debug!(
                slot_id = %candidate.id,
                "Grid changed since the clash was reported; asking again."
            );
            self.state = ResolutionState::PendingConflict {
                candidate: candidate.clone(),
                conflicts: current.clone(),
            };
            self.updating = updating;
            return Err(GridError::from(ClashError {
                candidate,
                conflicts: current,
            })
            .into());
        }

        let colliding: HashSet<SlotId> = current.into_iter().map(|c| c.existing.id).collect();
        for id in &colliding {
            grid.remove(id);
        }
        grid.commit_unchecked(candidate.clone());
        info!(slot_id = %candidate.id, replaced = colliding.len(), "Clashing slots replaced.");
        self.state = ResolutionState::Committed {
            slot: candidate.clone(),
        };
        Ok(candidate)
    }

    /// Drops the pending candidate and hands its values back so the edit form
    /// can reopen pre-filled.
    pub fn reschedule(&mut self) -> Result<SlotDraft, ResolutionError> {
        let (candidate, _) = self.take_pending()?;
        debug!(slot_id = %candidate.id, "Candidate sent back for rescheduling.");
        Ok(SlotDraft::from(&candidate))
    }

    fn take_pending(&mut self) -> Result<(Slot, Vec<Conflict>), ResolutionError> {
        match std::mem::take(&mut self.state) {
            ResolutionState::PendingConflict { candidate, conflicts } => Ok((candidate, conflicts)),
            other => {
                self.state = other;
                Err(ResolutionError::NothingPending)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConflictKind;
    use crate::grid::tests::draft;

    fn seeded() -> (TimetableGrid, Slot) {
        let mut grid = TimetableGrid::new();
        let first = grid.insert(draft("Monday", "1", "t1", "c1", "r1", "s1")).unwrap();
        grid.take_events();
        (grid, first)
    }

    #[test]
    fn clash_moves_editor_to_pending() {
        let (mut grid, first) = seeded();
        let mut editor = SlotEditor::new();
        assert!(editor
            .submit_insert(&mut grid, draft("Monday", "1", "t1", "c2", "r2", "s2"))
            .is_err());
        match editor.state() {
            ResolutionState::PendingConflict { conflicts, .. } => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].kind, ConflictKind::Teacher);
                assert_eq!(conflicts[0].existing, first);
            }
            other => panic!("expected pending conflict, got {other:?}"),
        }
    }

    #[test]
    fn replace_commits_candidate_in_place_of_clashing_slot() {
        let (mut grid, first) = seeded();
        let mut editor = SlotEditor::new();
        let _ = editor.submit_insert(&mut grid, draft("Monday", "1", "t1", "c2", "r2", "s2"));

        let committed = editor.replace(&mut grid).unwrap();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.slots()[0], committed);
        assert!(grid.get(&first.id).is_none());
        assert_eq!(
            editor.state(),
            &ResolutionState::Committed {
                slot: committed.clone()
            }
        );
        assert!(grid.audit().is_empty());
    }

    #[test]
    fn replace_removes_every_implicated_slot() {
        let mut grid = TimetableGrid::new();
        grid.insert(draft("Monday", "1", "t1", "c1", "r1", "s1")).unwrap();
        grid.insert(draft("Monday", "1", "t2", "c2", "r2", "s1")).unwrap();
        let keep = grid.insert(draft("Monday", "2", "t1", "c1", "r1", "s1")).unwrap();

        let mut editor = SlotEditor::new();
        let _ = editor.submit_insert(&mut grid, draft("Monday", "1", "t1", "c2", "r3", "s3"));
        let committed = editor.replace(&mut grid).unwrap();

        assert_eq!(grid.slots(), &[keep, committed]);
    }

    #[test]
    fn replace_of_clashing_update_keeps_cardinality_consistent() {
        let (mut grid, first) = seeded();
        let second = grid.insert(draft("Tuesday", "1", "t2", "c2", "r2", "s2")).unwrap();
        let mut editor = SlotEditor::new();
        let _ = editor.submit_update(&mut grid, &second.id, draft("Monday", "1", "t2", "c2", "r1", "s2"));

        let moved = editor.replace(&mut grid).unwrap();
        assert_eq!(moved.id, second.id);
        assert_eq!(grid.len(), 1);
        assert!(grid.get(&first.id).is_none());
        let events = grid.take_events();
        assert!(events.contains(&crate::grid::GridEvent::SlotRemoved { slot_id: first.id }));
        assert!(events.contains(&crate::grid::GridEvent::SlotUpdated { slot: moved }));
    }

    #[test]
    fn stale_replace_asks_again_without_removing_anything() {
        let (mut grid, first) = seeded();
        let mut editor = SlotEditor::new();
        let _ = editor.submit_insert(&mut grid, draft("Monday", "1", "t1", "c2", "r2", "s2"));

        // Another writer books the candidate's room meanwhile.
        let intruder = grid.insert(draft("Monday", "1", "t9", "c9", "r2", "s9")).unwrap();

        let err = editor.replace(&mut grid).unwrap_err();
        assert!(matches!(err, ResolutionError::Grid(GridError::Clash(_))));
        assert_eq!(grid.len(), 2);
        assert!(grid.get(&first.id).is_some());
        match editor.state() {
            ResolutionState::PendingConflict { conflicts, .. } => {
                let ids: Vec<_> = conflicts.iter().map(|c| c.existing.id.clone()).collect();
                assert_eq!(ids, vec![first.id, intruder.id]);
            }
            other => panic!("expected pending conflict, got {other:?}"),
        }
    }

    #[test]
    fn approved_slot_that_moved_away_survives_replace() {
        let (mut grid, first) = seeded();
        let mut editor = SlotEditor::new();
        let _ = editor.submit_insert(&mut grid, draft("Monday", "1", "t1", "c2", "r2", "s2"));

        // Another writer moves the clashing slot to Friday meanwhile.
        grid.update(&first.id, draft("Friday", "4", "t1", "c1", "r1", "s1")).unwrap();

        let committed = editor.replace(&mut grid).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.get(&first.id).map(|s| s.day), Some(crate::domain::Day::Friday));
        assert!(grid.get(&committed.id).is_some());
    }

    #[test]
    fn replace_of_update_whose_slot_was_deleted_fails() {
        let (mut grid, first) = seeded();
        let second = grid.insert(draft("Tuesday", "1", "t2", "c2", "r2", "s2")).unwrap();
        let mut editor = SlotEditor::new();
        let _ = editor.submit_update(&mut grid, &second.id, draft("Monday", "1", "t2", "c2", "r1", "s2"));

        grid.remove(&second.id);

        assert_eq!(
            editor.replace(&mut grid),
            Err(ResolutionError::Grid(GridError::UnknownSlot(second.id.clone())))
        );
        assert_eq!(grid.len(), 1);
        assert!(grid.get(&first.id).is_some());
        assert!(grid.get(&second.id).is_none());
        assert_eq!(editor.state(), &ResolutionState::Idle);
    }

    #[test]
    fn cancel_leaves_grid_untouched() {
        let (mut grid, _) = seeded();
        let before = grid.slots().to_vec();
        let mut editor = SlotEditor::new();
        let _ = editor.submit_insert(&mut grid, draft("Monday", "1", "t1", "c2", "r2", "s2"));

        editor.cancel().unwrap();
        assert_eq!(editor.state(), &ResolutionState::Idle);
        assert_eq!(grid.slots(), before.as_slice());
        assert!(grid.take_events().is_empty());
    }

    #[test]
    fn reschedule_returns_prefilled_draft() {
        let (mut grid, _) = seeded();
        let mut editor = SlotEditor::new();
        let err = editor
            .submit_insert(&mut grid, draft("Monday", "1", "t1", "c2", "r2", "s2"))
            .unwrap_err();
        let GridError::Clash(clash) = err else {
            panic!("expected a clash");
        };

        let form = editor.reschedule().unwrap();
        assert_eq!(form.id, Some(clash.candidate.id));
        assert_eq!(form.day, "Monday");
        assert_eq!(form.teacher_id, "t1");
        assert_eq!(form.class_id, "c2");
        assert_eq!(editor.state(), &ResolutionState::Idle);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn transitions_require_a_pending_conflict() {
        let (mut grid, _) = seeded();
        let mut editor = SlotEditor::new();
        assert_eq!(editor.cancel(), Err(ResolutionError::NothingPending));
        assert_eq!(editor.replace(&mut grid), Err(ResolutionError::NothingPending));
        assert_eq!(editor.reschedule(), Err(ResolutionError::NothingPending));
    }

    #[test]
    fn successful_submission_clears_pending_state() {
        let (mut grid, _) = seeded();
        let mut editor = SlotEditor::new();
        let _ = editor.submit_insert(&mut grid, draft("Monday", "1", "t1", "c2", "r2", "s2"));
        assert!(editor.is_pending());
        editor
            .submit_insert(&mut grid, draft("Monday", "2", "t1", "c2", "r2", "s2"))
            .unwrap();
        assert_eq!(editor.state(), &ResolutionState::Idle);
    }
}
