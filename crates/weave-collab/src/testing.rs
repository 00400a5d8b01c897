use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use weave_db::{Database, queries};
use weave_gateway::{NoopPublisher, Publisher};
use weave_types::models::{Document, UserSummary};

use crate::activity::ActivityLog;
use crate::convert;
use crate::documents::DocumentService;
use crate::manager::CollaborationManager;
use crate::notify::{InvitationNotice, InvitationNotifier};

/// In-memory store with an owner, an invitee-to-be, a stranger and one document.
pub(crate) struct Fixture {
    pub db: Arc<Database>,
    pub owner: UserSummary,
    pub guest: UserSummary,
    pub stranger: UserSummary,
    pub doc: Document,
}

impl Fixture {
    pub fn new() -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let owner = add_user(&db, "Olga", "olga@example.com");
        let guest = add_user(&db, "Ana", "a@x.com");
        let stranger = add_user(&db, "Bruno", "bruno@example.com");
        let doc = DocumentService::new(db.clone())
            .create(owner.id, "Checkout form")
            .unwrap();

        Self {
            db,
            owner,
            guest,
            stranger,
            doc,
        }
    }

    pub fn manager(&self, publisher: Arc<dyn Publisher>) -> CollaborationManager {
        CollaborationManager::new(self.db.clone(), publisher)
    }

    pub fn activity_log(&self) -> ActivityLog {
        ActivityLog::new(self.db.clone(), Arc::new(NoopPublisher))
    }

    /// Put `user` straight into the accepted state.
    pub fn make_collaborator(&self, user: &UserSummary) {
        let now = convert::stamp(Utc::now());
        self.db
            .with_conn(|conn| {
                queries::insert_collaboration(conn, &self.doc.id.to_string(), &user.id.to_string(), "accepted", &now)
            })
            .unwrap();
    }

    pub fn rows_for(&self, user_id: Uuid) -> i64 {
        self.db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM collaborations WHERE document_id = ?1 AND user_id = ?2",
                    [self.doc.id.to_string(), user_id.to_string()],
                    |r| r.get(0),
                )?)
            })
            .unwrap()
    }
}

pub(crate) fn add_user(db: &Database, name: &str, email: &str) -> UserSummary {
    let id = Uuid::new_v4();
    db.create_user(&id.to_string(), name, email, &convert::stamp(Utc::now()))
        .unwrap();
    UserSummary {
        id,
        name: name.into(),
        email: email.into(),
    }
}

/// Keeps every notice it is handed.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub notices: Mutex<Vec<InvitationNotice>>,
}

impl InvitationNotifier for RecordingNotifier {
    fn invitation_sent(&self, notice: &InvitationNotice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}
