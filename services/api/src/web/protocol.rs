//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser console and the
//! API server. The server pushes grid changes so open timetable views can
//! re-render without polling.

use serde::{Deserialize, Serialize};
use timetable_core::{GridEvent, ReviewReport, Slot, SlotId};
use uuid::Uuid;

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving events of one timetable.
    Subscribe { timetable_id: Uuid },

    /// Stop receiving events of one timetable.
    Unsubscribe { timetable_id: Uuid },
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms a subscription.
    Subscribed { timetable_id: Uuid },

    /// Confirms an unsubscription.
    Unsubscribed { timetable_id: Uuid },

    SlotAdded { timetable_id: Uuid, slot: Slot },

    SlotUpdated { timetable_id: Uuid, slot: Slot },

    SlotRemoved { timetable_id: Uuid, slot_id: SlotId },

    /// The whole timetable is gone; views should close.
    TimetableDeleted { timetable_id: Uuid },

    /// A review has started. The UI can show a "checking for conflicts" state.
    ReviewStarted { timetable_id: Uuid },

    ReviewCompleted { timetable_id: Uuid, report: ReviewReport },

    /// The review was superseded by a newer request or the timetable was deleted.
    ReviewCancelled { timetable_id: Uuid },

    /// Reports a problem with a client message.
    Error { message: String },
}

impl ServerMessage {
    pub fn from_grid_event(timetable_id: Uuid, event: GridEvent) -> Self {
        match event {
            GridEvent::SlotAdded { slot } => Self::SlotAdded { timetable_id, slot },
            GridEvent::SlotUpdated { slot } => Self::SlotUpdated { timetable_id, slot },
            GridEvent::SlotRemoved { slot_id } => Self::SlotRemoved {
                timetable_id,
                slot_id,
            },
        }
    }

    /// The timetable this message is about, if any.
    pub fn timetable_id(&self) -> Option<Uuid> {
        match self {
            Self::Subscribed { timetable_id }
            | Self::Unsubscribed { timetable_id }
            | Self::SlotAdded { timetable_id, .. }
            | Self::SlotUpdated { timetable_id, .. }
            | Self::SlotRemoved { timetable_id, .. }
            | Self::TimetableDeleted { timetable_id }
            | Self::ReviewStarted { timetable_id }
            | Self::ReviewCompleted { timetable_id, .. }
            | Self::ReviewCancelled { timetable_id } => Some(*timetable_id),
            Self::Error { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_use_snake_case_tags() {
        let id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"subscribe","timetable_id":"{id}"}}"#);
        match serde_json::from_str::<ClientMessage>(&raw).unwrap() {
            ClientMessage::Subscribe { timetable_id } => assert_eq!(timetable_id, id),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn removal_event_serializes_with_type_tag() {
        let id = Uuid::nil();
        let message = ServerMessage::from_grid_event(
            id,
            GridEvent::SlotRemoved {
                slot_id: SlotId::from("a"),
            },
        );
        assert_eq!(message.timetable_id(), Some(id));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "slot_removed");
        assert_eq!(json["slot_id"], "a");
    }
}
