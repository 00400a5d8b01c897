/// Database row types. These map directly to SQLite rows.
/// Distinct from weave-types models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: String,
}

pub struct DocumentRow {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct CollaborationRow {
    pub document_id: String,
    pub user_id: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A collaboration joined with the collaborator's identity.
pub struct CollaboratorRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub status: String,
    pub updated_at: String,
}

/// An activity joined with the actor's display identity.
pub struct ActivityRow {
    pub id: String,
    pub document_id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_email: String,
    pub action_type: String,
    pub action_data: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
}

/// Insert payload for the activity log.
pub struct NewActivity<'a> {
    pub id: &'a str,
    pub document_id: &'a str,
    pub user_id: &'a str,
    pub action_type: &'a str,
    pub action_data: Option<&'a str>,
    pub description: Option<&'a str>,
    pub created_at: &'a str,
}
