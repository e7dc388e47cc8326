//! In-memory store, used when no database is configured and in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Database;
use crate::bids::{Bid, BidPatch, BidSnapshot};
use crate::error::DatabaseError;
use crate::invoices::Invoice;
use crate::pricing::{NewRate, RateEntry};
use crate::profile::UserProfile;
use crate::proposals::ProposalResponse;

#[derive(Default)]
pub struct MemoryDatabase {
    bids: RwLock<Vec<Bid>>,
    rates: RwLock<Vec<RateEntry>>,
    responses: RwLock<Vec<ProposalResponse>>,
    invoices: RwLock<Vec<Invoice>>,
    profiles: RwLock<HashMap<String, UserProfile>>,
    failures: AtomicU32,
    write_failures: AtomicU32,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` calls fail with [`DatabaseError::Unavailable`].
    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    /// Make the next `n` writes fail; reads are unaffected.
    pub fn fail_next_writes(&self, n: u32) {
        self.write_failures.store(n, Ordering::SeqCst);
    }

    /// Insert a bid as-is, bypassing the create path.
    pub async fn insert_bid(&self, bid: Bid) {
        self.bids.write().await.push(bid);
    }

    /// Insert a response as-is.
    pub async fn insert_response(&self, response: ProposalResponse) {
        self.responses.write().await.push(response);
    }

    fn check(&self) -> Result<(), DatabaseError> {
        take_failure(&self.failures)
    }

    fn check_write(&self) -> Result<(), DatabaseError> {
        self.check()?;
        take_failure(&self.write_failures)
    }
}

fn take_failure(counter: &AtomicU32) -> Result<(), DatabaseError> {
    match counter.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)) {
        Ok(_) => Err(DatabaseError::Unavailable("injected failure".to_string())),
        Err(_) => Ok(()),
    }
}

fn not_found(entity: &'static str, id: Uuid) -> DatabaseError {
    DatabaseError::NotFound { entity, id }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn list_bids(&self, owner: &str) -> Result<Vec<Bid>, DatabaseError> {
        self.check()?;
        let mut bids: Vec<Bid> = self
            .bids
            .read()
            .await
            .iter()
            .filter(|b| b.owner == owner)
            .cloned()
            .collect();
        bids.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(bids)
    }

    async fn get_bid(&self, id: Uuid) -> Result<Option<Bid>, DatabaseError> {
        self.check()?;
        Ok(self.bids.read().await.iter().find(|b| b.id == id).cloned())
    }

    async fn create_bid(&self, owner: &str, snapshot: &BidSnapshot) -> Result<Bid, DatabaseError> {
        self.check_write()?;
        let bid = Bid::new(owner, snapshot.clone());
        self.bids.write().await.push(bid.clone());
        tracing::debug!("Created bid {} for {}", bid.id, owner);
        Ok(bid)
    }

    async fn update_bid(
        &self,
        owner: &str,
        id: Uuid,
        snapshot: &BidSnapshot,
    ) -> Result<Bid, DatabaseError> {
        self.check_write()?;
        let mut bids = self.bids.write().await;
        let bid = bids
            .iter_mut()
            .find(|b| b.id == id && b.owner == owner)
            .ok_or_else(|| not_found("bid", id))?;
        bid.replace(snapshot.clone());
        Ok(bid.clone())
    }

    async fn patch_bid(
        &self,
        owner: &str,
        id: Uuid,
        patch: &BidPatch,
    ) -> Result<Bid, DatabaseError> {
        self.check_write()?;
        let mut bids = self.bids.write().await;
        let bid = bids
            .iter_mut()
            .find(|b| b.id == id && b.owner == owner)
            .ok_or_else(|| not_found("bid", id))?;
        bid.apply_patch(patch);
        Ok(bid.clone())
    }

    async fn delete_bid(&self, owner: &str, id: Uuid) -> Result<bool, DatabaseError> {
        self.check_write()?;
        let mut bids = self.bids.write().await;
        let before = bids.len();
        bids.retain(|b| !(b.id == id && b.owner == owner));
        Ok(bids.len() < before)
    }

    async fn list_rates(&self, owner: &str) -> Result<Vec<RateEntry>, DatabaseError> {
        self.check()?;
        let mut rates: Vec<RateEntry> = self
            .rates
            .read()
            .await
            .iter()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect();
        rates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rates)
    }

    async fn create_rate(&self, owner: &str, rate: &NewRate) -> Result<RateEntry, DatabaseError> {
        self.check_write()?;
        let entry = RateEntry::new(owner, rate.clone());
        self.rates.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn update_rate(
        &self,
        owner: &str,
        id: Uuid,
        rate: &NewRate,
    ) -> Result<RateEntry, DatabaseError> {
        self.check_write()?;
        let mut rates = self.rates.write().await;
        let entry = rates
            .iter_mut()
            .find(|r| r.id == id && r.owner == owner)
            .ok_or_else(|| not_found("rate", id))?;
        entry.apply(rate.clone());
        Ok(entry.clone())
    }

    async fn delete_rate(&self, owner: &str, id: Uuid) -> Result<bool, DatabaseError> {
        self.check_write()?;
        let mut rates = self.rates.write().await;
        let before = rates.len();
        rates.retain(|r| !(r.id == id && r.owner == owner));
        Ok(rates.len() < before)
    }

    async fn list_responses_for_bids(
        &self,
        bid_ids: &[Uuid],
    ) -> Result<Vec<ProposalResponse>, DatabaseError> {
        self.check()?;
        let mut responses: Vec<ProposalResponse> = self
            .responses
            .read()
            .await
            .iter()
            .filter(|r| bid_ids.contains(&r.bid_id))
            .cloned()
            .collect();
        responses.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(responses)
    }

    async fn create_response(&self, response: &ProposalResponse) -> Result<(), DatabaseError> {
        self.check_write()?;
        let mut responses = self.responses.write().await;
        if responses.iter().any(|r| r.bid_id == response.bid_id) {
            return Err(DatabaseError::Duplicate {
                entity: "Proposal response",
                id: response.bid_id,
            });
        }
        responses.push(response.clone());
        Ok(())
    }

    async fn list_invoices(&self, owner: &str) -> Result<Vec<Invoice>, DatabaseError> {
        self.check()?;
        let mut invoices: Vec<Invoice> = self
            .invoices
            .read()
            .await
            .iter()
            .filter(|i| i.owner == owner)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }

    async fn get_invoice(&self, owner: &str, id: Uuid) -> Result<Option<Invoice>, DatabaseError> {
        self.check()?;
        Ok(self
            .invoices
            .read()
            .await
            .iter()
            .find(|i| i.id == id && i.owner == owner)
            .cloned())
    }

    async fn create_invoice(&self, invoice: &Invoice) -> Result<(), DatabaseError> {
        self.check_write()?;
        self.invoices.write().await.push(invoice.clone());
        Ok(())
    }

    async fn update_invoice(&self, invoice: &Invoice) -> Result<(), DatabaseError> {
        self.check_write()?;
        let mut invoices = self.invoices.write().await;
        let existing = invoices
            .iter_mut()
            .find(|i| i.id == invoice.id && i.owner == invoice.owner)
            .ok_or_else(|| not_found("invoice", invoice.id))?;
        *existing = invoice.clone();
        existing.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_invoice(&self, owner: &str, id: Uuid) -> Result<bool, DatabaseError> {
        self.check_write()?;
        let mut invoices = self.invoices.write().await;
        let before = invoices.len();
        invoices.retain(|i| !(i.id == id && i.owner == owner));
        Ok(invoices.len() < before)
    }

    async fn get_profile(&self, owner: &str) -> Result<Option<UserProfile>, DatabaseError> {
        self.check()?;
        Ok(self.profiles.read().await.get(owner).cloned())
    }

    async fn save_profile(&self, owner: &str, profile: &UserProfile) -> Result<(), DatabaseError> {
        self.check_write()?;
        self.profiles
            .write()
            .await
            .insert(owner.to_string(), profile.clone().normalized());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bids::{BidDraft, BidStatus};

    fn snapshot(title: &str) -> BidSnapshot {
        BidDraft {
            project_title: title.into(),
            ..Default::default()
        }
        .snapshot()
    }

    #[tokio::test]
    async fn test_bids_are_owner_scoped() {
        let db = MemoryDatabase::new();
        let mine = db.create_bid("me", &snapshot("Mine")).await.unwrap();
        db.create_bid("you", &snapshot("Yours")).await.unwrap();

        let listed = db.list_bids("me").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);

        assert!(db.update_bid("you", mine.id, &snapshot("Stolen")).await.is_err());
        assert!(!db.delete_bid("you", mine.id).await.unwrap());
        assert!(db.delete_bid("me", mine.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_sorted_by_update() {
        let db = MemoryDatabase::new();
        let first = db.create_bid("me", &snapshot("First")).await.unwrap();
        db.create_bid("me", &snapshot("Second")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        db.patch_bid("me", first.id, &BidPatch::status(BidStatus::Sent))
            .await
            .unwrap();

        let listed = db.list_bids("me").await.unwrap();
        assert_eq!(listed[0].id, first.id);
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let db = MemoryDatabase::new();
        db.fail_next(2);
        assert!(matches!(
            db.list_bids("me").await,
            Err(DatabaseError::Unavailable(_))
        ));
        assert!(db.list_bids("me").await.is_err());
        assert!(db.list_bids("me").await.is_ok());
    }

    #[tokio::test]
    async fn test_one_response_per_bid() {
        use crate::proposals::{ResponseSubmission, ResponseType};

        let db = MemoryDatabase::new();
        let bid_id = Uuid::new_v4();
        let submission = ResponseSubmission {
            response_type: ResponseType::Accepted,
            notes: None,
            client_email: Some("client@example.com".into()),
        };
        db.create_response(&ProposalResponse::new(bid_id, submission.clone()))
            .await
            .unwrap();

        let again = db
            .create_response(&ProposalResponse::new(bid_id, submission))
            .await;
        assert!(matches!(again, Err(DatabaseError::Duplicate { id, .. }) if id == bid_id));
        assert_eq!(db.list_responses_for_bids(&[bid_id]).await.unwrap().len(), 1);
    }
}
