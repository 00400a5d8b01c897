use crate::models::{
    ActivityRow, CollaborationRow, CollaboratorRow, DocumentRow, NewActivity, UserRow,
};
use crate::Database;
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, Row};

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, name: &str, email: &str, created_at: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id, name, email, created_at),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| get_user_by_id(conn, id))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| get_user_by_email(conn, email))
    }

    // -- Documents --

    pub fn get_document(&self, id: &str) -> Result<Option<DocumentRow>> {
        self.with_conn(|conn| get_document(conn, id))
    }

    pub fn list_owned_documents(&self, owner_id: &str) -> Result<Vec<DocumentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, owner_id, content, created_at, updated_at
                 FROM documents
                 WHERE owner_id = ?1
                 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([owner_id], document_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Documents on which `user_id` holds a collaboration with the given status.
    pub fn list_documents_for_collaborator(
        &self,
        user_id: &str,
        status: &str,
    ) -> Result<Vec<DocumentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT d.id, d.name, d.owner_id, d.content, d.created_at, d.updated_at
                 FROM collaborations c
                 JOIN documents d ON d.id = c.document_id
                 WHERE c.user_id = ?1 AND c.status = ?2
                 ORDER BY c.updated_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id, status], document_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Collaborations --

    pub fn find_collaboration(
        &self,
        document_id: &str,
        user_id: &str,
    ) -> Result<Option<CollaborationRow>> {
        self.with_conn(|conn| find_collaboration(conn, document_id, user_id))
    }

    pub fn list_accepted(&self, document_id: &str) -> Result<Vec<CollaboratorRow>> {
        self.with_conn(|conn| list_accepted(conn, document_id))
    }

    // -- Activities --

    pub fn list_activities(&self, document_id: &str) -> Result<Vec<ActivityRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.document_id, a.user_id, u.name, u.email,
                        a.action_type, a.action_data, a.description, a.created_at
                 FROM activities a
                 JOIN users u ON u.id = a.user_id
                 WHERE a.document_id = ?1
                 ORDER BY a.created_at ASC, a.rowid ASC",
            )?;
            let rows = stmt
                .query_map([document_id], activity_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

// Free functions take a `&Connection` so they compose inside `Database::write_tx`.

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    conn.query_row(
        "SELECT id, name, email, created_at FROM users WHERE id = ?1",
        [id],
        user_from_row,
    )
    .optional()
}

/// Email lookup is case-insensitive (the column is `COLLATE NOCASE`).
pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<UserRow>> {
    conn.query_row(
        "SELECT id, name, email, created_at FROM users WHERE email = ?1",
        [email.trim()],
        user_from_row,
    )
    .optional()
}

pub fn insert_document(conn: &Connection, row: &DocumentRow) -> Result<()> {
    conn.execute(
        "INSERT INTO documents (id, name, owner_id, content, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        (
            &row.id,
            &row.name,
            &row.owner_id,
            &row.content,
            &row.created_at,
            &row.updated_at,
        ),
    )?;
    Ok(())
}

pub fn get_document(conn: &Connection, id: &str) -> Result<Option<DocumentRow>> {
    conn.query_row(
        "SELECT id, name, owner_id, content, created_at, updated_at FROM documents WHERE id = ?1",
        [id],
        document_from_row,
    )
    .optional()
}

/// Returns false when no such document existed.
pub fn delete_document(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute("DELETE FROM documents WHERE id = ?1", [id])?;
    Ok(affected > 0)
}

pub fn find_collaboration(
    conn: &Connection,
    document_id: &str,
    user_id: &str,
) -> Result<Option<CollaborationRow>> {
    conn.query_row(
        "SELECT document_id, user_id, status, created_at, updated_at
         FROM collaborations
         WHERE document_id = ?1 AND user_id = ?2",
        [document_id, user_id],
        |row| {
            Ok(CollaborationRow {
                document_id: row.get(0)?,
                user_id: row.get(1)?,
                status: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
            })
        },
    )
    .optional()
}

/// Insert a collaboration row. Returns false if the (document, user) pair
/// already exists; the UNIQUE constraint is the arbiter for concurrent inserts.
pub fn insert_collaboration(
    conn: &Connection,
    document_id: &str,
    user_id: &str,
    status: &str,
    now: &str,
) -> Result<bool> {
    let result = conn.execute(
        "INSERT INTO collaborations (document_id, user_id, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        (document_id, user_id, status, now),
    );

    match result {
        Ok(_) => Ok(true),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Compare-and-set on status. Returns true only if the row was in `from`
/// at the moment of the update.
pub fn transition_collaboration(
    conn: &Connection,
    document_id: &str,
    user_id: &str,
    from: &str,
    to: &str,
    now: &str,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE collaborations SET status = ?4, updated_at = ?5
         WHERE document_id = ?1 AND user_id = ?2 AND status = ?3",
        (document_id, user_id, from, to, now),
    )?;
    Ok(affected == 1)
}

/// Returns false when there was nothing to delete.
pub fn delete_collaboration(conn: &Connection, document_id: &str, user_id: &str) -> Result<bool> {
    let affected = conn.execute(
        "DELETE FROM collaborations WHERE document_id = ?1 AND user_id = ?2",
        [document_id, user_id],
    )?;
    Ok(affected > 0)
}

pub fn list_accepted(conn: &Connection, document_id: &str) -> Result<Vec<CollaboratorRow>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.name, u.email, c.status, c.updated_at
         FROM collaborations c
         JOIN users u ON u.id = c.user_id
         WHERE c.document_id = ?1 AND c.status = 'accepted'
         ORDER BY c.updated_at ASC",
    )?;

    let rows = stmt
        .query_map([document_id], |row| {
            Ok(CollaboratorRow {
                user_id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                status: row.get(3)?,
                updated_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

pub fn append_activity(conn: &Connection, activity: &NewActivity<'_>) -> Result<()> {
    conn.execute(
        "INSERT INTO activities (id, document_id, user_id, action_type, action_data, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            activity.id,
            activity.document_id,
            activity.user_id,
            activity.action_type,
            activity.action_data,
            activity.description,
            activity.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_activity(conn: &Connection, id: &str) -> Result<Option<ActivityRow>> {
    conn.query_row(
        "SELECT a.id, a.document_id, a.user_id, u.name, u.email,
                a.action_type, a.action_data, a.description, a.created_at
         FROM activities a
         JOIN users u ON u.id = a.user_id
         WHERE a.id = ?1",
        [id],
        activity_from_row,
    )
    .optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<ActivityRow> {
    Ok(ActivityRow {
        id: row.get(0)?,
        document_id: row.get(1)?,
        user_id: row.get(2)?,
        user_name: row.get(3)?,
        user_email: row.get(4)?,
        action_type: row.get(5)?,
        action_data: row.get(6)?,
        description: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
