use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use weave_db::models::{CollaborationRow, UserRow};
use weave_db::{Database, queries};
use weave_gateway::Publisher;
use weave_types::events::RoomEvent;
use weave_types::models::{
    Collaboration, CollaborationStatus, Collaborator, Document, RoomId, UserSummary,
};

use crate::access::AccessControl;
use crate::activity::{actions, record};
use crate::convert;
use crate::error::{CollabError, Result};
use crate::notify::{InvitationNotice, InvitationNotifier, LogNotifier};

const PENDING: &str = "pending";
const ACCEPTED: &str = "accepted";
const REJECTED: &str = "rejected";

/// What following an invitation link did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteLinkOutcome {
    /// The visitor owns the document; nothing changed
    AlreadyOwner,
    /// The visitor is already an accepted collaborator; nothing changed
    AlreadyCollaborator,
    /// A previously rejected invitation is pending again
    Reopened,
    /// A pending invitation already existed; nothing changed
    Pending,
    /// A new pending invitation was created
    Requested,
}

impl InviteLinkOutcome {
    /// Short machine-readable code for redirects.
    pub fn notice(&self) -> &'static str {
        match self {
            Self::AlreadyOwner => "already_owner",
            Self::AlreadyCollaborator => "already_collaborator",
            Self::Reopened | Self::Pending | Self::Requested => "invitation_pending",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InviteLinkVisit {
    pub document: Document,
    pub outcome: InviteLinkOutcome,
}

impl InviteLinkVisit {
    pub fn message(&self) -> String {
        match self.outcome {
            InviteLinkOutcome::AlreadyOwner => {
                format!("You already own \"{}\".", self.document.name)
            }
            InviteLinkOutcome::AlreadyCollaborator => {
                format!("You are already a collaborator on \"{}\".", self.document.name)
            }
            _ => format!(
                "You have been invited to collaborate on \"{}\". Check your pending invitations.",
                self.document.name
            ),
        }
    }
}

/// State machine over collaboration rows:
///
/// ```text
/// (none) --invite / invite link--> pending --accept--> accepted
///                                  pending --reject--> rejected --invite link--> pending
/// any status --remove / leave--> (none)
/// ```
///
/// Each transition is a single store transaction that also appends the
/// matching activity record. Room events go out only after commit.
#[derive(Clone)]
pub struct CollaborationManager {
    db: Arc<Database>,
    access: AccessControl,
    publisher: Arc<dyn Publisher>,
    notifier: Arc<dyn InvitationNotifier>,
    public_url: String,
}

impl CollaborationManager {
    pub fn new(db: Arc<Database>, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            access: AccessControl::new(db.clone()),
            db,
            publisher,
            notifier: Arc::new(LogNotifier),
            public_url: "http://localhost:3000".into(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn InvitationNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Base URL used to build invitation links.
    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = public_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn invite_link(&self, document_id: Uuid) -> String {
        format!("{}/invite/{}", self.public_url, document_id)
    }

    /// Owner invites a registered user by email. Any existing row for the
    /// pair, whatever its status, is a conflict.
    pub fn invite(
        &self,
        document_id: Uuid,
        inviter_id: Uuid,
        invitee_email: &str,
    ) -> Result<Collaboration> {
        let (document, owner_id) = self.access.load_owned(document_id, Some(inviter_id))?;

        let invitee_email = invitee_email.trim();
        if invitee_email.is_empty() {
            return Err(CollabError::Invalid("email must not be empty".into()));
        }

        let invitee_row = self
            .db
            .get_user_by_email(invitee_email)?
            .ok_or(CollabError::NotFound("user"))?;
        let invitee = convert::user_summary(&invitee_row)?;

        if invitee.id == owner_id {
            return Err(CollabError::Conflict("the owner cannot be invited to their own document"));
        }

        let now = Utc::now();
        let (row, inviter_row) =
            match self.db.write_tx(|tx| insert_invitation(tx, document.id, owner_id, &invitee, now))? {
                InviteInsert::Inserted { row, inviter } => (row, inviter),
                // deleted between the ownership check and the write
                InviteInsert::DocumentGone => return Err(CollabError::Unauthorized),
                InviteInsert::Exists => {
                    return Err(CollabError::Conflict(
                        "this user is already a collaborator or has a pending invitation",
                    ));
                }
            };
        let collaboration = convert::collaboration(row)?;

        info!("{} invited {} to document {}", owner_id, invitee.id, document.id);

        match inviter_row.map(|r| convert::user_summary(&r)).transpose() {
            Ok(Some(inviter)) => self.notifier.invitation_sent(&InvitationNotice {
                document_id: document.id,
                document_name: document.name.clone(),
                inviter,
                invitee,
                link: self.invite_link(document.id),
            }),
            Ok(None) => debug!("Inviter {} has no user record, skipping notification", owner_id),
            Err(e) => debug!("Skipping invitation notification: {}", e),
        }

        Ok(collaboration)
    }

    /// Invitee accepts. Only a row that is pending right now qualifies, so
    /// of two racing accepts exactly one wins.
    pub fn accept(&self, document_id: Uuid, user_id: Uuid) -> Result<Collaboration> {
        let now = Utc::now();
        let doc_id = document_id.to_string();
        let uid = user_id.to_string();

        let committed = self.db.write_tx(|tx| {
            if !queries::transition_collaboration(tx, &doc_id, &uid, PENDING, ACCEPTED, &convert::stamp(now))? {
                return Ok(None);
            }
            record(tx, document_id, user_id, actions::COLLABORATOR_ACCEPTED, None, None, now)?;
            let user = queries::get_user_by_id(tx, &uid)?
                .ok_or_else(|| anyhow::anyhow!("collaborator {} has no user record", uid))?;
            Ok(Some((fetch_row(tx, &doc_id, &uid)?, user)))
        })?;

        let (row, user) = committed.ok_or(CollabError::NotFound("pending invitation"))?;
        let collaboration = convert::collaboration(row)?;

        info!("{} accepted invitation to document {}", user_id, document_id);

        self.publisher.publish(RoomEvent::CollaboratorAccepted {
            document_id,
            room_id: RoomId::for_document(document_id),
            user: user.name,
            user_id,
            email: user.email,
            timestamp: now.timestamp(),
        });

        Ok(collaboration)
    }

    /// Invitee declines. Same lookup discipline as [`accept`](Self::accept).
    pub fn reject(&self, document_id: Uuid, user_id: Uuid) -> Result<Collaboration> {
        let now = Utc::now();
        let doc_id = document_id.to_string();
        let uid = user_id.to_string();

        let row = self.db.write_tx(|tx| {
            if !queries::transition_collaboration(tx, &doc_id, &uid, PENDING, REJECTED, &convert::stamp(now))? {
                return Ok(None);
            }
            record(tx, document_id, user_id, actions::INVITATION_REJECTED, None, None, now)?;
            fetch_row(tx, &doc_id, &uid).map(Some)
        })?;

        let row = row.ok_or(CollabError::NotFound("pending invitation"))?;
        info!("{} rejected invitation to document {}", user_id, document_id);
        Ok(convert::collaboration(row)?)
    }

    /// Owner removes a collaborator or withdraws an invitation.
    pub fn remove(&self, document_id: Uuid, owner_id: Uuid, target_user_id: Uuid) -> Result<()> {
        let (document, owner_id) = self.access.load_owned(document_id, Some(owner_id))?;
        let now = Utc::now();

        let removed = self.db.write_tx(|tx| {
            if !queries::delete_collaboration(tx, &document.id.to_string(), &target_user_id.to_string())? {
                return Ok(false);
            }
            record(
                tx,
                document.id,
                owner_id,
                actions::COLLABORATOR_REMOVED,
                Some(&json!({ "userId": target_user_id })),
                None,
                now,
            )?;
            Ok(true)
        })?;

        if !removed {
            return Err(CollabError::NotFound("collaborator"));
        }

        info!("{} removed {} from document {}", owner_id, target_user_id, document.id);

        self.publisher.publish(RoomEvent::CollaboratorRemoved {
            document_id: document.id,
            room_id: document.room_id(),
            user_id: target_user_id,
            removed_by: owner_id,
            timestamp: now.timestamp(),
        });

        Ok(())
    }

    /// A user drops their own row, whatever its status.
    pub fn leave(&self, document_id: Uuid, user_id: Uuid) -> Result<()> {
        let now = Utc::now();

        let left = self.db.write_tx(|tx| {
            if !queries::delete_collaboration(tx, &document_id.to_string(), &user_id.to_string())? {
                return Ok(false);
            }
            record(tx, document_id, user_id, actions::COLLABORATOR_LEFT, None, None, now)?;
            Ok(true)
        })?;

        if !left {
            return Err(CollabError::NotFound("collaboration"));
        }

        info!("{} left document {}", user_id, document_id);

        self.publisher.publish(RoomEvent::CollaboratorLeft {
            document_id,
            room_id: RoomId::for_document(document_id),
            user_id,
            timestamp: now.timestamp(),
        });

        Ok(())
    }

    /// Entry point for a user following an invitation link. Repeated calls
    /// change nothing after the first transition.
    pub fn handle_invite_link(&self, document_id: Uuid, user_id: Uuid) -> Result<InviteLinkVisit> {
        let document = self
            .access
            .find_document(document_id)?
            .ok_or(CollabError::NotFound("document"))?;

        if document.owner_id == user_id {
            return Ok(InviteLinkVisit {
                document,
                outcome: InviteLinkOutcome::AlreadyOwner,
            });
        }

        let now = Utc::now();
        let doc_id = document.id.to_string();
        let uid = user_id.to_string();

        let outcome = self.db.write_tx(|tx| {
            let existing = queries::find_collaboration(tx, &doc_id, &uid)?;
            let status = existing
                .map(|row| convert::collaboration(row).map(|c| c.status))
                .transpose()?;

            let outcome = match status {
                Some(CollaborationStatus::Accepted) => InviteLinkOutcome::AlreadyCollaborator,
                Some(CollaborationStatus::Pending) => InviteLinkOutcome::Pending,
                Some(CollaborationStatus::Rejected) => {
                    if queries::transition_collaboration(tx, &doc_id, &uid, REJECTED, PENDING, &convert::stamp(now))? {
                        record(tx, document.id, user_id, actions::INVITATION_REOPENED, None, None, now)?;
                        InviteLinkOutcome::Reopened
                    } else {
                        InviteLinkOutcome::Pending
                    }
                }
                None => {
                    if queries::insert_collaboration(tx, &doc_id, &uid, PENDING, &convert::stamp(now))? {
                        record(tx, document.id, user_id, actions::INVITATION_REQUESTED, None, None, now)?;
                        InviteLinkOutcome::Requested
                    } else {
                        InviteLinkOutcome::Pending
                    }
                }
            };
            Ok(outcome)
        })?;

        match outcome {
            InviteLinkOutcome::Reopened | InviteLinkOutcome::Requested => {
                info!("{} opened invitation link for document {} ({:?})", user_id, document.id, outcome)
            }
            _ => debug!("{} revisited invitation link for document {} ({:?})", user_id, document.id, outcome),
        }

        Ok(InviteLinkVisit { document, outcome })
    }

    /// Accepted collaborators only; pending and rejected rows stay private.
    pub fn list_collaborators(&self, document_id: Uuid, caller_id: Uuid) -> Result<Vec<Collaborator>> {
        let (document, _) = self.access.load_for_caller(document_id, Some(caller_id))?;
        let collaborators = self
            .db
            .list_accepted(&document.id.to_string())?
            .into_iter()
            .map(convert::collaborator)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(collaborators)
    }
}

enum InviteInsert {
    Inserted {
        row: CollaborationRow,
        inviter: Option<UserRow>,
    },
    Exists,
    DocumentGone,
}

/// Write side of `invite`. The document is re-read inside the transaction
/// so a concurrent delete cannot surface as a foreign key failure.
fn insert_invitation(
    tx: &weave_db::Connection,
    document_id: Uuid,
    owner_id: Uuid,
    invitee: &UserSummary,
    now: DateTime<Utc>,
) -> anyhow::Result<InviteInsert> {
    let doc_id = document_id.to_string();
    let user_id = invitee.id.to_string();

    if queries::get_document(tx, &doc_id)?.is_none() {
        return Ok(InviteInsert::DocumentGone);
    }
    if queries::find_collaboration(tx, &doc_id, &user_id)?.is_some() {
        return Ok(InviteInsert::Exists);
    }
    if !queries::insert_collaboration(tx, &doc_id, &user_id, PENDING, &convert::stamp(now))? {
        return Ok(InviteInsert::Exists);
    }
    record(
        tx,
        document_id,
        owner_id,
        actions::COLLABORATOR_INVITED,
        Some(&json!({ "userId": invitee.id, "email": invitee.email })),
        None,
        now,
    )?;
    let inviter = queries::get_user_by_id(tx, &owner_id.to_string())?;
    let row = fetch_row(tx, &doc_id, &user_id)?;
    Ok(InviteInsert::Inserted { row, inviter })
}

fn fetch_row(conn: &weave_db::Connection, document_id: &str, user_id: &str) -> anyhow::Result<CollaborationRow> {
    queries::find_collaboration(conn, document_id, user_id)?
        .ok_or_else(|| anyhow::anyhow!("collaboration {}/{} vanished mid-transaction", document_id, user_id))
}
