use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use weave_db::models::NewActivity;
use weave_db::{Connection, Database, queries};
use weave_gateway::Publisher;
use weave_types::events::RoomEvent;
use weave_types::models::{ActivityRecord, RoomId};

use crate::access::AccessControl;
use crate::convert;
use crate::error::{CollabError, Result};

/// Action types written by the collaboration state machine itself.
pub mod actions {
    pub const DOCUMENT_CREATED: &str = "document_created";
    pub const COLLABORATOR_INVITED: &str = "collaborator_invited";
    pub const COLLABORATOR_ACCEPTED: &str = "collaborator_accepted";
    pub const INVITATION_REJECTED: &str = "invitation_rejected";
    pub const COLLABORATOR_REMOVED: &str = "collaborator_removed";
    pub const COLLABORATOR_LEFT: &str = "collaborator_left";
    pub const INVITATION_REOPENED: &str = "invitation_reopened";
    pub const INVITATION_REQUESTED: &str = "invitation_requested";
}

/// Insert an activity row on an open connection or transaction, skipping
/// the access gate. Used for records the system writes on a user's behalf,
/// e.g. when a user rejects an invitation and so never held access.
pub(crate) fn record(
    conn: &Connection,
    document_id: Uuid,
    actor_id: Uuid,
    action_type: &str,
    action_data: Option<&serde_json::Value>,
    description: Option<&str>,
    at: DateTime<Utc>,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let action_data = action_data
        .map(serde_json::to_string)
        .transpose()
        .context("serializing action_data")?;

    queries::append_activity(
        conn,
        &NewActivity {
            id: &id.to_string(),
            document_id: &document_id.to_string(),
            user_id: &actor_id.to_string(),
            action_type,
            action_data: action_data.as_deref(),
            description,
            created_at: &convert::stamp(at),
        },
    )?;

    Ok(id)
}

/// Append-only audit trail of document mutations.
#[derive(Clone)]
pub struct ActivityLog {
    db: Arc<Database>,
    access: AccessControl,
    publisher: Arc<dyn Publisher>,
}

impl ActivityLog {
    pub fn new(db: Arc<Database>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            access: AccessControl::new(db.clone()),
            db,
            publisher,
        }
    }

    /// Record an action by `actor` on a document they can access, then
    /// announce it to the document's room.
    pub fn append(
        &self,
        document_id: Uuid,
        actor: Option<Uuid>,
        action_type: &str,
        action_data: Option<serde_json::Value>,
        description: Option<String>,
    ) -> Result<ActivityRecord> {
        let (document, actor_id) = self.access.load_for_caller(document_id, actor)?;

        let action_type = action_type.trim();
        if action_type.is_empty() {
            return Err(CollabError::Invalid("action_type must not be empty".into()));
        }

        let now = Utc::now();
        let row = self.db.write_tx(|tx| {
            let id = record(
                tx,
                document.id,
                actor_id,
                action_type,
                action_data.as_ref(),
                description.as_deref(),
                now,
            )?;
            queries::get_activity(tx, &id.to_string())?
                .ok_or_else(|| anyhow::anyhow!("activity {} vanished after insert", id))
        })?;
        let activity = convert::activity(row)?;

        info!(
            "{} recorded '{}' on document {}",
            actor_id, activity.action_type, document.id
        );

        self.publisher.publish(RoomEvent::ActivityRecorded {
            document_id: document.id,
            room_id: RoomId::for_document(document.id),
            activity_id: activity.id,
            user_id: actor_id,
            action_type: activity.action_type.clone(),
            description: activity.description.clone(),
            timestamp: now.timestamp(),
        });

        Ok(activity)
    }

    /// All records for a document, oldest first.
    pub fn list(&self, document_id: Uuid, caller: Option<Uuid>) -> Result<Vec<ActivityRecord>> {
        let (document, _) = self.access.load_for_caller(document_id, caller)?;

        let records = self
            .db
            .list_activities(&document.id.to_string())?
            .into_iter()
            .map(convert::activity)
            .collect::<anyhow::Result<Vec<_>>>()?;

        debug!("Listed {} activities for document {}", records.len(), document.id);
        Ok(records)
    }
}
