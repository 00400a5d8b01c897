use tracing::info;
use uuid::Uuid;

use weave_types::models::UserSummary;

/// Everything needed to tell an invitee about a new invitation.
#[derive(Debug, Clone)]
pub struct InvitationNotice {
    pub document_id: Uuid,
    pub document_name: String,
    pub inviter: UserSummary,
    pub invitee: UserSummary,
    /// Link that lands on the invite-link handler for this document.
    pub link: String,
}

/// Outbound channel for invitation messages (mail, push, ...).
///
/// Called after the invitation is committed. Delivery problems are the
/// notifier's own concern and never affect the invitation.
pub trait InvitationNotifier: Send + Sync {
    fn invitation_sent(&self, notice: &InvitationNotice);
}

/// Writes invitations to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl InvitationNotifier for LogNotifier {
    fn invitation_sent(&self, notice: &InvitationNotice) {
        info!(
            document_id = %notice.document_id,
            invitee = %notice.invitee.email,
            link = %notice.link,
            "{} invited {} to collaborate on \"{}\"",
            notice.inviter.name,
            notice.invitee.name,
            notice.document_name,
        );
    }
}
