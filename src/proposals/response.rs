//! Client responses to a shared proposal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bids::{Bid, BidStatus};
use crate::db::Database;
use crate::error::{DatabaseError, ProposalError};
use crate::notify::{Notifier, response_notification};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Accepted,
    Rejected,
    ChangesRequested,
}

impl ResponseType {
    /// The bid status this response reconciles to.
    pub fn status(&self) -> BidStatus {
        match self {
            Self::Accepted => BidStatus::Accepted,
            Self::Rejected => BidStatus::Rejected,
            Self::ChangesRequested => BidStatus::ChangesRequested,
        }
    }
}

/// What the client submits through the public link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSubmission {
    pub response_type: ResponseType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
}

impl ResponseSubmission {
    /// Acceptance needs a contact email; a change request needs notes.
    pub fn validate(&self) -> Result<(), ProposalError> {
        match self.response_type {
            ResponseType::Accepted => {
                let email = self.client_email.as_deref().unwrap_or("").trim();
                if email.is_empty() || !email.contains('@') {
                    return Err(ProposalError::InvalidResponse(
                        "Please enter a valid email address.".to_string(),
                    ));
                }
            }
            ResponseType::ChangesRequested => {
                if self.notes.as_deref().unwrap_or("").trim().is_empty() {
                    return Err(ProposalError::InvalidResponse(
                        "Please describe the changes you would like to request.".to_string(),
                    ));
                }
            }
            ResponseType::Rejected => {}
        }
        Ok(())
    }
}

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResponse {
    pub id: Uuid,
    pub bid_id: Uuid,
    pub response_type: ResponseType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProposalResponse {
    pub fn new(bid_id: Uuid, submission: ResponseSubmission) -> Self {
        Self {
            id: Uuid::new_v4(),
            bid_id,
            response_type: submission.response_type,
            notes: submission.notes.filter(|n| !n.trim().is_empty()),
            client_email: submission.client_email.map(|e| e.trim().to_string()),
            created_at: Utc::now(),
        }
    }
}

/// A bid whose proposal is publicly viewable.
#[derive(Debug, Clone)]
pub struct PublicProposal {
    pub bid: Bid,
    pub html: String,
    pub existing_response: Option<ProposalResponse>,
}

/// Load a shared proposal. Bids without stored proposal content are not viewable.
pub async fn load_public_proposal(
    db: &dyn Database,
    bid_id: Uuid,
) -> Result<PublicProposal, ProposalError> {
    let bid = db
        .get_bid(bid_id)
        .await?
        .ok_or(ProposalError::BidNotFound(bid_id))?;
    let html = match &bid.proposal_html {
        Some(html) if !html.trim().is_empty() => html.clone(),
        _ => return Err(ProposalError::NotGenerated(bid_id)),
    };
    let existing_response = db
        .list_responses_for_bids(&[bid_id])
        .await?
        .into_iter()
        .next();

    Ok(PublicProposal {
        bid,
        html,
        existing_response,
    })
}

/// Record a client response and notify the bid owner.
///
/// The notification is best-effort: a delivery failure is logged and the
/// stored response is still returned.
pub async fn submit_response(
    db: &dyn Database,
    notifier: &dyn Notifier,
    bid_id: Uuid,
    submission: ResponseSubmission,
) -> Result<ProposalResponse, ProposalError> {
    submission.validate()?;
    let proposal = load_public_proposal(db, bid_id).await?;
    if proposal.existing_response.is_some() {
        return Err(ProposalError::AlreadyResponded);
    }

    let response = ProposalResponse::new(bid_id, submission);
    // The store enforces one response per bid; a concurrent submit loses here.
    db.create_response(&response).await.map_err(|e| match e {
        DatabaseError::Duplicate { .. } => ProposalError::AlreadyResponded,
        other => other.into(),
    })?;
    tracing::info!(
        "Recorded {:?} response for bid {}",
        response.response_type,
        bid_id
    );

    let notification = response_notification(&proposal.bid, &response);
    if let Err(e) = notifier.notify(&notification).await {
        tracing::warn!("Owner notification for bid {} failed: {}", bid_id, e);
    }

    Ok(response)
}
