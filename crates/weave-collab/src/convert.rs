//! Row → model conversion and timestamp helpers.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;
use uuid::Uuid;

use weave_db::models::{ActivityRow, CollaborationRow, CollaboratorRow, DocumentRow, UserRow};
use weave_types::models::{
    ActivityRecord, Collaboration, CollaborationStatus, Collaborator, Document, UserSummary,
};

/// Stored timestamp form. Fixed-width RFC 3339, so lexical order is
/// chronological order.
pub(crate) fn stamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid> {
    value
        .parse()
        .with_context(|| format!("corrupt {} '{}'", field, value))
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by SQLite's datetime('now') carry no timezone.
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", value, e);
            DateTime::default()
        })
}

fn parse_status(value: &str) -> Result<CollaborationStatus> {
    value.parse().map_err(|e: String| anyhow::anyhow!(e))
}

pub(crate) fn user_summary(row: &UserRow) -> Result<UserSummary> {
    Ok(UserSummary {
        id: parse_uuid("user id", &row.id)?,
        name: row.name.clone(),
        email: row.email.clone(),
    })
}

pub(crate) fn document(row: DocumentRow) -> Result<Document> {
    let content = serde_json::from_str(&row.content).unwrap_or_else(|e| {
        warn!("Corrupt content on document '{}': {}", row.id, e);
        serde_json::Value::Null
    });

    Ok(Document {
        id: parse_uuid("document id", &row.id)?,
        owner_id: parse_uuid("owner id", &row.owner_id)?,
        name: row.name,
        content,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}

pub(crate) fn collaboration(row: CollaborationRow) -> Result<Collaboration> {
    Ok(Collaboration {
        document_id: parse_uuid("document id", &row.document_id)?,
        user_id: parse_uuid("user id", &row.user_id)?,
        status: parse_status(&row.status)?,
        created_at: parse_timestamp(&row.created_at),
        updated_at: parse_timestamp(&row.updated_at),
    })
}

pub(crate) fn collaborator(row: CollaboratorRow) -> Result<Collaborator> {
    Ok(Collaborator {
        user: UserSummary {
            id: parse_uuid("user id", &row.user_id)?,
            name: row.name,
            email: row.email,
        },
        status: parse_status(&row.status)?,
        since: parse_timestamp(&row.updated_at),
    })
}

pub(crate) fn activity(row: ActivityRow) -> Result<ActivityRecord> {
    let action_data = row.action_data.as_deref().and_then(|raw| {
        serde_json::from_str(raw)
            .map_err(|e| warn!("Corrupt action_data on activity '{}': {}", row.id, e))
            .ok()
    });
    let user_id = parse_uuid("user id", &row.user_id)?;

    Ok(ActivityRecord {
        id: parse_uuid("activity id", &row.id)?,
        document_id: parse_uuid("document id", &row.document_id)?,
        user_id,
        action_type: row.action_type,
        action_data,
        description: row.description,
        created_at: parse_timestamp(&row.created_at),
        user: UserSummary {
            id: user_id,
            name: row.user_name,
            email: row.user_email,
        },
    })
}
