pub mod document;
pub mod domain;
pub mod error;
pub mod grid;
pub mod ports;
pub mod resolution;
pub mod review;

pub use document::{TimetableDocument, TimetableSummary};
pub use domain::{Conflict, ConflictKind, Day, EditorSession, Period, Slot, SlotDraft, SlotId};
pub use error::{ClashError, FieldIssue, FieldProblem, GridError, ResolutionError, SlotField, ValidationError};
pub use grid::{GridEvent, SlotFilter, TimetableGrid};
pub use ports::{PortError, PortResult, TimetableRepository};
pub use resolution::{ResolutionState, SlotEditor};
pub use review::{review, ClashReport, ReviewReport};
