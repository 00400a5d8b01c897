use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Collaborator, Document, UserSummary};

// -- JWT Claims --

/// Bearer token claims. Tokens are issued by the external identity service
/// and only verified here, so the shape must match what that service signs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub name: String,
    pub email: String,
    pub exp: usize,
}

// -- Documents --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDocumentRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DocumentDetail {
    pub document: Document,
    pub owner: UserSummary,
    pub collaborators: Vec<Collaborator>,
    pub is_owner: bool,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub owned: Vec<Document>,
    pub collaborating: Vec<Document>,
    pub pending_invitations: Vec<Document>,
}

// -- Collaboration --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InviteRequest {
    pub email: String,
}

// -- Activity --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppendActivityRequest {
    pub action_type: String,
    #[serde(default)]
    pub action_data: Option<serde_json::Value>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Plain informational or error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
