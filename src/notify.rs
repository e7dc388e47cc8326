//! Owner notifications for client responses.

use async_trait::async_trait;

use crate::bids::Bid;
use crate::error::NotifyError;
use crate::proposals::{ProposalResponse, ResponseType};

/// An outgoing message to a bid owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub to: String,
    pub from_name: String,
    pub subject: String,
    pub body: String,
}

/// Delivers notifications. Callers treat delivery as best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notification.to,
            subject = %notification.subject,
            "Owner notification"
        );
        tracing::debug!("Notification body:\n{}", notification.body);
        Ok(())
    }
}

/// Build the owner notification for a client response.
pub fn response_notification(bid: &Bid, response: &ProposalResponse) -> Notification {
    let title = &bid.draft.project_title;
    let client = &bid.draft.client_name;

    let (subject, body) = match response.response_type {
        ResponseType::Accepted => (
            format!("✅ Proposal Accepted: \"{title}\""),
            format!(
                "Good news!\n\n{client} has accepted your proposal for \"{title}\".\n\n\
                 A permanent acceptance record has been created in your ProfitPilot account. \
                 You can log in to create an invoice.\n\nClient Contact: {}",
                response.client_email.as_deref().unwrap_or("")
            ),
        ),
        ResponseType::Rejected => (
            format!("❌ Proposal Not Accepted: \"{title}\""),
            format!(
                "This is an automated notification that {client} has decided not to move \
                 forward with the proposal for \"{title}\" at this time."
            ),
        ),
        ResponseType::ChangesRequested => (
            format!("📝 Change Request for \"{title}\""),
            format!(
                "{client} has requested changes for the proposal \"{title}\".\n\n\
                 Their notes: \"{}\"",
                response.notes.as_deref().unwrap_or("")
            ),
        ),
    };

    Notification {
        to: bid.owner.clone(),
        from_name: format!("{client} (via ProfitPilot)"),
        subject,
        body: format!("{body}\n\nRegards,\nThe ProfitPilot Team"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bids::{BidDraft, BidSnapshot};
    use crate::proposals::ResponseSubmission;

    fn bid() -> Bid {
        let draft = BidDraft {
            client_name: "Dana".into(),
            project_title: "Roof".into(),
            ..Default::default()
        };
        let snapshot: BidSnapshot = draft.snapshot();
        Bid::new("owner@example.com", snapshot)
    }

    #[test]
    fn test_change_request_notification() {
        let bid = bid();
        let response = ProposalResponse::new(
            bid.id,
            ResponseSubmission {
                response_type: ResponseType::ChangesRequested,
                notes: Some("Add gutters".into()),
                client_email: None,
            },
        );
        let n = response_notification(&bid, &response);
        assert_eq!(n.to, "owner@example.com");
        assert_eq!(n.from_name, "Dana (via ProfitPilot)");
        assert_eq!(n.subject, "📝 Change Request for \"Roof\"");
        assert!(n.body.contains("Their notes: \"Add gutters\""));
        assert!(n.body.ends_with("The ProfitPilot Team"));
    }
}
