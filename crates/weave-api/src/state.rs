use std::sync::Arc;

use weave_collab::{ActivityLog, CollaborationManager, DocumentService, InvitationNotifier};
use weave_db::Database;
use weave_gateway::Publisher;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub documents: DocumentService,
    pub collaborations: CollaborationManager,
    pub activity: ActivityLog,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(
        db: Arc<Database>,
        publisher: Arc<dyn Publisher>,
        notifier: Arc<dyn InvitationNotifier>,
        public_url: &str,
        jwt_secret: String,
    ) -> Self {
        Self {
            documents: DocumentService::new(db.clone()),
            collaborations: CollaborationManager::new(db.clone(), publisher.clone())
                .with_notifier(notifier)
                .with_public_url(public_url),
            activity: ActivityLog::new(db.clone(), publisher),
            db,
            jwt_secret,
        }
    }
}
