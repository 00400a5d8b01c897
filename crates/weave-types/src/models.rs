use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimal user identity exposed to other participants.
/// Never carries anything beyond id, name and email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// A shared form layout or canvas. The content blob belongs to the editor
/// and is passed through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub name: String,
    pub owner_id: Uuid,
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn room_id(&self) -> RoomId {
        RoomId::for_document(self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl CollaborationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for CollaborationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollaborationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown collaboration status '{}'", other)),
        }
    }
}

/// Per-user relationship to a document. At most one per (document, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaboration {
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub status: CollaborationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An accepted collaborator as listed to other participants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collaborator {
    #[serde(flatten)]
    pub user: UserSummary,
    pub status: CollaborationStatus,
    pub since: DateTime<Utc>,
}

/// Append-only audit entry, with the actor reduced to a display summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub document_id: Uuid,
    pub user_id: Uuid,
    pub action_type: String,
    pub action_data: Option<serde_json::Value>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user: UserSummary,
}

/// Broadcast destination for a document: `room-{document_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn for_document(document_id: Uuid) -> Self {
        Self(format!("room-{}", document_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
