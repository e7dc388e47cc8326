//! Bid list loading and status reconciliation.
//!
//! Client responses are written through the public proposal link, never to
//! the bid itself. Each load copies the latest response onto its bid, then
//! re-reads the list so what is shown is what is stored.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;
use uuid::Uuid;

use super::editor::Confirm;
use super::model::{Bid, BidPatch, example_bid};
use crate::db::Database;
use crate::error::{BidError, DatabaseError};
use crate::proposals::ProposalResponse;
use crate::retry::RetryPolicy;

pub const LOAD_FAILED: &str = "Failed to load bid data. Please check your connection and try again.";

pub const CONFIRM_DELETE: &str =
    "Are you sure you want to permanently delete this bid? This action cannot be undone.";

/// A loaded bid list.
#[derive(Debug, Clone, Default)]
pub struct BidList {
    /// Stored bids, most recently updated first, or the example bid.
    pub bids: Vec<Bid>,
    /// Latest client response per bid.
    pub responses: HashMap<Uuid, ProposalResponse>,
    /// Number of bids whose status was reconciled during this load.
    pub synced: usize,
    /// Set when every load attempt failed.
    pub error: Option<String>,
}

impl BidList {
    fn example() -> Self {
        Self {
            bids: vec![example_bid()],
            ..Default::default()
        }
    }

    pub fn is_example(&self) -> bool {
        self.bids.iter().all(|b| b.is_example)
    }
}

/// Latest response per bid. Later `created_at` wins; ties go to the later record.
pub fn latest_responses(
    responses: impl IntoIterator<Item = ProposalResponse>,
) -> HashMap<Uuid, ProposalResponse> {
    let mut latest: HashMap<Uuid, ProposalResponse> = HashMap::new();
    for response in responses {
        match latest.get(&response.bid_id) {
            Some(existing) if existing.created_at > response.created_at => {}
            _ => {
                latest.insert(response.bid_id, response);
            }
        }
    }
    latest
}

/// Patches that bring each bid's status in line with its latest response.
///
/// Response notes replace the bid's change-request notes; without notes the
/// existing ones are kept.
pub fn plan_status_updates(
    bids: &[Bid],
    responses: &HashMap<Uuid, ProposalResponse>,
) -> Vec<(Uuid, BidPatch)> {
    bids.iter()
        .filter_map(|bid| {
            let response = responses.get(&bid.id)?;
            let status = response.response_type.status();
            if bid.status() == status {
                return None;
            }
            let patch = BidPatch {
                status: Some(status),
                change_request_notes: response
                    .notes
                    .clone()
                    .or_else(|| bid.change_request_notes.clone()),
                proposal_html: None,
            };
            Some((bid.id, patch))
        })
        .collect()
}

pub struct BidListLoader {
    db: Arc<dyn Database>,
    policy: RetryPolicy,
}

impl BidListLoader {
    pub fn new(db: Arc<dyn Database>, policy: RetryPolicy) -> Self {
        Self { db, policy }
    }

    /// Load and reconcile, retrying per the policy.
    ///
    /// Never fails: after the last attempt the list holds the example bid
    /// and `error` is set. An owner with no bids also sees the example bid.
    pub async fn load(&self, owner: &str) -> BidList {
        if owner.trim().is_empty() {
            return BidList::example();
        }

        let db = self.db.as_ref();
        let result = self
            .policy
            .run("Bid list load", move || async move {
                load_and_sync(db, owner).await
            })
            .await;

        match result {
            Ok(list) if list.bids.is_empty() => BidList::example(),
            Ok(list) => list,
            Err(_) => BidList {
                error: Some(LOAD_FAILED.to_string()),
                ..BidList::example()
            },
        }
    }

    /// Delete a stored bid after confirmation. Returns whether it was deleted.
    pub async fn delete_bid(
        &self,
        owner: &str,
        bid: &Bid,
        confirm: &dyn Confirm,
    ) -> Result<bool, BidError> {
        if bid.is_example {
            return Err(BidError::ExampleBid);
        }
        if !confirm.confirm(CONFIRM_DELETE) {
            return Ok(false);
        }
        let deleted = self.db.delete_bid(owner, bid.id).await?;
        if deleted {
            tracing::info!("Deleted bid {}", bid.id);
        }
        Ok(deleted)
    }
}

/// One load-and-reconcile pass.
pub async fn load_and_sync(db: &dyn Database, owner: &str) -> Result<BidList, DatabaseError> {
    let mut bids = db.list_bids(owner).await?;
    let ids: Vec<Uuid> = bids.iter().map(|b| b.id).collect();

    let responses = if ids.is_empty() {
        HashMap::new()
    } else {
        latest_responses(db.list_responses_for_bids(&ids).await?)
    };

    let updates = plan_status_updates(&bids, &responses);
    let synced = updates.len();
    if synced > 0 {
        tracing::info!("Reconciling {} bid status(es) for {}", synced, owner);
        try_join_all(
            updates
                .iter()
                .map(|(id, patch)| db.patch_bid(owner, *id, patch)),
        )
        .await?;
        bids = db.list_bids(owner).await?;
    }

    Ok(BidList {
        bids,
        responses,
        synced,
        error: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bids::{BidDraft, BidStatus};
    use crate::db::MemoryDatabase;
    use crate::proposals::{ResponseSubmission, ResponseType};
    use chrono::{Duration as ChronoDuration, Utc};
    use std::time::Duration;

    fn response(bid_id: Uuid, kind: ResponseType, notes: Option<&str>) -> ProposalResponse {
        ProposalResponse::new(
            bid_id,
            ResponseSubmission {
                response_type: kind,
                notes: notes.map(String::from),
                client_email: None,
            },
        )
    }

    fn loader(db: &Arc<MemoryDatabase>) -> BidListLoader {
        BidListLoader::new(db.clone(), RetryPolicy::fixed(3, Duration::from_millis(1500)))
    }

    async fn stored_bid(db: &MemoryDatabase, title: &str) -> Bid {
        let draft = BidDraft {
            project_title: title.into(),
            ..Default::default()
        };
        db.create_bid("me", &draft.snapshot()).await.unwrap()
    }

    #[test]
    fn test_latest_response_wins() {
        let bid = Uuid::new_v4();
        let mut older = response(bid, ResponseType::ChangesRequested, Some("old"));
        older.created_at = Utc::now() - ChronoDuration::hours(1);
        let newer = response(bid, ResponseType::Accepted, None);

        let map = latest_responses(vec![newer.clone(), older]);
        assert_eq!(map[&bid].id, newer.id);
    }

    #[test]
    fn test_notes_fall_back_to_existing() {
        let mut bid = Bid::new("me", BidDraft::default().snapshot());
        bid.change_request_notes = Some("keep me".into());
        let responses = latest_responses(vec![response(bid.id, ResponseType::Rejected, None)]);

        let updates = plan_status_updates(std::slice::from_ref(&bid), &responses);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.status, Some(BidStatus::Rejected));
        assert_eq!(updates[0].1.change_request_notes.as_deref(), Some("keep me"));
    }

    #[tokio::test]
    async fn test_reconciles_statuses() {
        let db = Arc::new(MemoryDatabase::new());
        let a = stored_bid(&db, "A").await;
        let b = stored_bid(&db, "B").await;
        let c = stored_bid(&db, "C").await;
        db.patch_bid("me", c.id, &BidPatch::status(BidStatus::Accepted))
            .await
            .unwrap();
        db.insert_response(response(a.id, ResponseType::ChangesRequested, Some("Add a door")))
            .await;
        db.insert_response(response(c.id, ResponseType::Accepted, None)).await;

        let list = loader(&db).load("me").await;

        assert_eq!(list.synced, 1);
        assert!(list.error.is_none());
        let by_id: HashMap<Uuid, &Bid> = list.bids.iter().map(|bid| (bid.id, bid)).collect();
        assert_eq!(by_id[&a.id].status(), BidStatus::ChangesRequested);
        assert_eq!(by_id[&a.id].change_request_notes.as_deref(), Some("Add a door"));
        assert_eq!(by_id[&b.id].status(), BidStatus::Draft);
        assert_eq!(by_id[&c.id].status(), BidStatus::Accepted);
        assert_eq!(list.responses.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_owner_sees_example() {
        let db = Arc::new(MemoryDatabase::new());
        let list = loader(&db).load("me").await;
        assert!(list.is_example());
        assert!(list.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_recovers() {
        let db = Arc::new(MemoryDatabase::new());
        stored_bid(&db, "A").await;
        db.fail_next(2);

        let list = loader(&db).load("me").await;
        assert!(list.error.is_none());
        assert_eq!(list.bids.len(), 1);
        assert!(!list.is_example());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_falls_back() {
        let db = Arc::new(MemoryDatabase::new());
        stored_bid(&db, "A").await;
        db.fail_next(3);

        let started = tokio::time::Instant::now();
        let list = loader(&db).load("me").await;

        assert!(list.is_example());
        assert_eq!(list.error.as_deref(), Some(LOAD_FAILED));
        assert_eq!(started.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_delete_needs_confirmation() {
        let db = Arc::new(MemoryDatabase::new());
        let bid = stored_bid(&db, "A").await;
        let loader = loader(&db);

        assert!(!loader.delete_bid("me", &bid, &|_: &str| false).await.unwrap());
        assert!(loader.delete_bid("me", &bid, &|_: &str| true).await.unwrap());
        assert!(matches!(
            loader.delete_bid("me", &example_bid(), &|_: &str| true).await,
            Err(BidError::ExampleBid)
        ));
    }
}
