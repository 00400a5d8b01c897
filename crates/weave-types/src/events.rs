use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::RoomId;

/// Events published to a document room on the external real-time server.
///
/// Serialized as `{"event": "<name>", "data": {...}}`, the envelope the
/// socket server's `/emit-event` endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum RoomEvent {
    /// An invitee accepted and is now a collaborator
    #[serde(rename_all = "camelCase")]
    CollaboratorAccepted {
        document_id: Uuid,
        room_id: RoomId,
        user: String,
        user_id: Uuid,
        email: String,
        timestamp: i64,
    },

    /// The owner removed a collaborator
    #[serde(rename_all = "camelCase")]
    CollaboratorRemoved {
        document_id: Uuid,
        room_id: RoomId,
        user_id: Uuid,
        removed_by: Uuid,
        timestamp: i64,
    },

    /// A collaborator (or invitee) left the document
    #[serde(rename_all = "camelCase")]
    CollaboratorLeft {
        document_id: Uuid,
        room_id: RoomId,
        user_id: Uuid,
        timestamp: i64,
    },

    /// A new entry was appended to the activity log
    #[serde(rename_all = "camelCase")]
    ActivityRecorded {
        document_id: Uuid,
        room_id: RoomId,
        activity_id: Uuid,
        user_id: Uuid,
        action_type: String,
        description: Option<String>,
        timestamp: i64,
    },
}

impl RoomEvent {
    /// The room this event is addressed to.
    pub fn room_id(&self) -> &RoomId {
        match self {
            Self::CollaboratorAccepted { room_id, .. }
            | Self::CollaboratorRemoved { room_id, .. }
            | Self::CollaboratorLeft { room_id, .. }
            | Self::ActivityRecorded { room_id, .. } => room_id,
        }
    }

    /// Wire name of the event, as used in the `event` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CollaboratorAccepted { .. } => "collaboratorAccepted",
            Self::CollaboratorRemoved { .. } => "collaboratorRemoved",
            Self::CollaboratorLeft { .. } => "collaboratorLeft",
            Self::ActivityRecorded { .. } => "activityRecorded",
        }
    }
}
