//! Entity store.
//!
//! Owner-scoped operations take the owner explicitly. `get_bid` and the
//! response calls are unscoped because the public proposal link uses them.

mod memory;
mod postgres;

pub use memory::MemoryDatabase;
pub use postgres::PgDatabase;

use async_trait::async_trait;
use uuid::Uuid;

use crate::bids::{Bid, BidPatch, BidSnapshot};
use crate::error::DatabaseError;
use crate::invoices::Invoice;
use crate::pricing::{NewRate, RateEntry};
use crate::profile::UserProfile;
use crate::proposals::ProposalResponse;

/// Database abstraction layer.
#[async_trait]
pub trait Database: Send + Sync {
    // --- Bids ---

    /// The owner's bids, most recently updated first.
    async fn list_bids(&self, owner: &str) -> Result<Vec<Bid>, DatabaseError>;

    async fn get_bid(&self, id: Uuid) -> Result<Option<Bid>, DatabaseError>;

    async fn create_bid(&self, owner: &str, snapshot: &BidSnapshot) -> Result<Bid, DatabaseError>;

    /// Overwrite a bid's editable fields and totals. Last write wins.
    async fn update_bid(
        &self,
        owner: &str,
        id: Uuid,
        snapshot: &BidSnapshot,
    ) -> Result<Bid, DatabaseError>;

    async fn patch_bid(&self, owner: &str, id: Uuid, patch: &BidPatch)
    -> Result<Bid, DatabaseError>;

    async fn delete_bid(&self, owner: &str, id: Uuid) -> Result<bool, DatabaseError>;

    // --- Rates ---

    async fn list_rates(&self, owner: &str) -> Result<Vec<RateEntry>, DatabaseError>;

    async fn create_rate(&self, owner: &str, rate: &NewRate) -> Result<RateEntry, DatabaseError>;

    async fn update_rate(
        &self,
        owner: &str,
        id: Uuid,
        rate: &NewRate,
    ) -> Result<RateEntry, DatabaseError>;

    async fn delete_rate(&self, owner: &str, id: Uuid) -> Result<bool, DatabaseError>;

    // --- Proposal responses ---

    /// Responses whose `bid_id` is in `bid_ids`, oldest first.
    async fn list_responses_for_bids(
        &self,
        bid_ids: &[Uuid],
    ) -> Result<Vec<ProposalResponse>, DatabaseError>;

    async fn create_response(&self, response: &ProposalResponse) -> Result<(), DatabaseError>;

    // --- Invoices ---

    /// The owner's invoices, newest first.
    async fn list_invoices(&self, owner: &str) -> Result<Vec<Invoice>, DatabaseError>;

    async fn get_invoice(&self, owner: &str, id: Uuid) -> Result<Option<Invoice>, DatabaseError>;

    async fn create_invoice(&self, invoice: &Invoice) -> Result<(), DatabaseError>;

    async fn update_invoice(&self, invoice: &Invoice) -> Result<(), DatabaseError>;

    async fn delete_invoice(&self, owner: &str, id: Uuid) -> Result<bool, DatabaseError>;

    // --- Profile ---

    async fn get_profile(&self, owner: &str) -> Result<Option<UserProfile>, DatabaseError>;

    async fn save_profile(&self, owner: &str, profile: &UserProfile) -> Result<(), DatabaseError>;
}
