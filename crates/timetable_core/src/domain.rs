//! crates/timetable_core/src/domain.rs
//!
//! Defines the core data structures of a weekly timetable.
//! Field names of the serialized forms are an external contract: exported
//! documents must import back unchanged.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Identifiers
//=========================================================================================

/// Opaque, stable identifier of a scheduled slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(transparent)]
pub struct SlotId(String);

impl SlotId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh identifier for a slot that has none yet.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SlotId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

//=========================================================================================
// Days and Periods
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a day name is not one of the seven weekdays.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a day of the week")]
pub struct UnknownDay(pub String);

impl FromStr for Day {
    type Err = UnknownDay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Day::ALL
            .into_iter()
            .find(|day| day.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownDay(s.to_string()))
    }
}

/// One teaching period of the school day. The order of a period list is the
/// order periods are rendered in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "time"))]
    pub starts_at: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "time"))]
    pub ends_at: Option<NaiveTime>,
}

impl Period {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            starts_at: None,
            ends_at: None,
        }
    }
}

//=========================================================================================
// Slots
//=========================================================================================

/// One scheduled occurrence of a subject, taught by a teacher to a class in a
/// room, at a fixed (day, period) coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: SlotId,
    pub day: Day,
    pub period_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub room_id: String,
    pub class_id: String,
}

/// The unvalidated contents of a slot form. Every field is free text until
/// the grid validates it into a [`Slot`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct SlotDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<SlotId>,
    pub day: String,
    pub period_id: String,
    pub subject_id: String,
    pub teacher_id: String,
    pub room_id: String,
    pub class_id: String,
}

impl From<&Slot> for SlotDraft {
    fn from(slot: &Slot) -> Self {
        Self {
            id: Some(slot.id.clone()),
            day: slot.day.name().to_string(),
            period_id: slot.period_id.clone(),
            subject_id: slot.subject_id.clone(),
            teacher_id: slot.teacher_id.clone(),
            room_id: slot.room_id.clone(),
            class_id: slot.class_id.clone(),
        }
    }
}

//=========================================================================================
// Conflicts
//=========================================================================================

/// The resource two slots compete for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Teacher,
    Class,
    Room,
}

impl ConflictKind {
    pub const ALL: [ConflictKind; 3] = [ConflictKind::Teacher, ConflictKind::Class, ConflictKind::Room];

    /// The identifier of the contested resource on `slot`.
    pub fn resource_of(self, slot: &Slot) -> &str {
        match self {
            ConflictKind::Teacher => &slot.teacher_id,
            ConflictKind::Class => &slot.class_id,
            ConflictKind::Room => &slot.room_id,
        }
    }

    /// True when both slots sit on the same (day, period) and share this resource.
    pub fn collides(self, a: &Slot, b: &Slot) -> bool {
        a.day == b.day && a.period_id == b.period_id && self.resource_of(a) == self.resource_of(b)
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictKind::Teacher => "Teacher",
            ConflictKind::Class => "Class",
            ConflictKind::Room => "Room",
        })
    }
}

/// A pairwise coincidence between a candidate slot and a stored one.
/// Computed on demand and never stored in the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Conflict {
    pub kind: ConflictKind,
    pub existing: Slot,
    pub message: String,
}

//=========================================================================================
// Editor Session
//=========================================================================================

/// The identity of whoever is editing. Created at the service boundary and
/// passed explicitly to every operation that needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct EditorSession {
    pub user_id: Uuid,
    pub display_name: String,
    pub signed_in_at: DateTime<Utc>,
}

impl EditorSession {
    pub fn new(user_id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            signed_in_at: Utc::now(),
        }
    }
}
