use std::sync::Arc;

use uuid::Uuid;

use weave_db::Database;
use weave_types::models::{CollaborationStatus, Document};

use crate::convert;
use crate::error::{CollabError, Result};

/// A user's standing on one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Owner,
    Collaborator,
    Outsider,
}

impl Role {
    /// Classify a user given their collaboration status (if any) on the
    /// document. Only an accepted collaboration grants access.
    pub fn classify(document: &Document, user_id: Uuid, status: Option<CollaborationStatus>) -> Self {
        if document.owner_id == user_id {
            Role::Owner
        } else if status == Some(CollaborationStatus::Accepted) {
            Role::Collaborator
        } else {
            Role::Outsider
        }
    }

    pub fn has_access(&self) -> bool {
        matches!(self, Role::Owner | Role::Collaborator)
    }
}

pub fn require_identity(caller: Option<Uuid>) -> Result<Uuid> {
    caller.ok_or(CollabError::Unauthenticated)
}

/// Owner-only gate. Needs no store lookup: ownership is immutable.
pub fn require_owner(document: &Document, caller: Option<Uuid>) -> Result<Uuid> {
    let user_id = require_identity(caller)?;
    if document.owner_id != user_id {
        return Err(CollabError::Unauthorized);
    }
    Ok(user_id)
}

/// Gate in front of every document read and write.
#[derive(Clone)]
pub struct AccessControl {
    db: Arc<Database>,
}

impl AccessControl {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn role_of(&self, document: &Document, user_id: Uuid) -> Result<Role> {
        if document.owner_id == user_id {
            return Ok(Role::Owner);
        }

        let status = self
            .db
            .find_collaboration(&document.id.to_string(), &user_id.to_string())?
            .map(|row| convert::collaboration(row).map(|c| c.status))
            .transpose()?;

        Ok(Role::classify(document, user_id, status))
    }

    pub fn has_access(&self, document: &Document, user_id: Uuid) -> Result<bool> {
        Ok(self.role_of(document, user_id)?.has_access())
    }

    /// Fails `Unauthenticated` without a caller and `Unauthorized` when the
    /// caller is neither owner nor accepted collaborator.
    pub fn require_access(&self, document: &Document, caller: Option<Uuid>) -> Result<Uuid> {
        let user_id = require_identity(caller)?;
        if !self.has_access(document, user_id)? {
            return Err(CollabError::Unauthorized);
        }
        Ok(user_id)
    }

    /// Fetch a document without any access check.
    pub fn find_document(&self, document_id: Uuid) -> Result<Option<Document>> {
        self.db
            .get_document(&document_id.to_string())?
            .map(convert::document)
            .transpose()
            .map_err(CollabError::from)
    }

    /// Resolve a document on behalf of `caller`. A missing document is
    /// reported exactly like one the caller may not see.
    pub fn load_for_caller(&self, document_id: Uuid, caller: Option<Uuid>) -> Result<(Document, Uuid)> {
        let user_id = require_identity(caller)?;
        let document = self.find_document(document_id)?.ok_or(CollabError::Unauthorized)?;
        self.require_access(&document, Some(user_id))?;
        Ok((document, user_id))
    }

    /// Resolve a document that only its owner may act on.
    pub fn load_owned(&self, document_id: Uuid, caller: Option<Uuid>) -> Result<(Document, Uuid)> {
        let user_id = require_identity(caller)?;
        let document = self.find_document(document_id)?.ok_or(CollabError::Unauthorized)?;
        require_owner(&document, Some(user_id))?;
        Ok((document, user_id))
    }
}
