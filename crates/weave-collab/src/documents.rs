use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use weave_db::models::DocumentRow;
use weave_db::{Database, queries};
use weave_types::api::{DashboardResponse, DocumentDetail};
use weave_types::models::{CollaborationStatus, Document};

use crate::access::AccessControl;
use crate::activity::{actions, record};
use crate::convert;
use crate::error::{CollabError, Result};

const MAX_NAME_LEN: usize = 255;

/// Document lifecycle around the collaboration core. Content is created
/// empty and otherwise left to the editor.
#[derive(Clone)]
pub struct DocumentService {
    db: Arc<Database>,
    access: AccessControl,
}

impl DocumentService {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            access: AccessControl::new(db.clone()),
            db,
        }
    }

    pub fn create(&self, owner_id: Uuid, name: &str) -> Result<Document> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
            return Err(CollabError::Invalid(format!(
                "name must be between 1 and {} characters",
                MAX_NAME_LEN
            )));
        }

        if self.db.get_user_by_id(&owner_id.to_string())?.is_none() {
            return Err(CollabError::NotFound("user"));
        }

        let now = Utc::now();
        let stamp = convert::stamp(now);
        let row = DocumentRow {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            content: "[]".into(),
            created_at: stamp.clone(),
            updated_at: stamp,
        };

        let document_id = convert::parse_uuid("document id", &row.id)?;
        self.db.write_tx(|tx| {
            queries::insert_document(tx, &row)?;
            record(
                tx,
                document_id,
                owner_id,
                actions::DOCUMENT_CREATED,
                Some(&json!({ "name": row.name })),
                None,
                now,
            )?;
            Ok(())
        })?;

        info!("{} created document {} ({})", owner_id, row.id, row.name);
        Ok(convert::document(row)?)
    }

    /// The document with its owner and accepted collaborators.
    pub fn show(&self, document_id: Uuid, caller: Option<Uuid>) -> Result<DocumentDetail> {
        let (document, user_id) = self.access.load_for_caller(document_id, caller)?;

        let owner_row = self
            .db
            .get_user_by_id(&document.owner_id.to_string())?
            .ok_or(CollabError::NotFound("owner"))?;
        let owner = convert::user_summary(&owner_row)?;

        let collaborators = self
            .db
            .list_accepted(&document.id.to_string())?
            .into_iter()
            .map(convert::collaborator)
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(DocumentDetail {
            is_owner: document.owner_id == user_id,
            document,
            owner,
            collaborators,
        })
    }

    /// Owner-only. Collaborations and activities go with the document.
    pub fn delete(&self, document_id: Uuid, caller: Option<Uuid>) -> Result<()> {
        let (document, owner_id) = self.access.load_owned(document_id, caller)?;

        let deleted = self
            .db
            .write_tx(|tx| queries::delete_document(tx, &document.id.to_string()))?;
        if !deleted {
            return Err(CollabError::NotFound("document"));
        }

        info!("{} deleted document {}", owner_id, document.id);
        Ok(())
    }

    /// Documents the user owns, collaborates on, and has pending invitations for.
    pub fn dashboard(&self, user_id: Uuid) -> Result<DashboardResponse> {
        let uid = user_id.to_string();
        let convert_all = |rows: Vec<DocumentRow>| {
            rows.into_iter()
                .map(convert::document)
                .collect::<anyhow::Result<Vec<_>>>()
        };

        Ok(DashboardResponse {
            owned: convert_all(self.db.list_owned_documents(&uid)?)?,
            collaborating: convert_all(
                self.db
                    .list_documents_for_collaborator(&uid, CollaborationStatus::Accepted.as_str())?,
            )?,
            pending_invitations: convert_all(
                self.db
                    .list_documents_for_collaborator(&uid, CollaborationStatus::Pending.as_str())?,
            )?,
        })
    }
}
