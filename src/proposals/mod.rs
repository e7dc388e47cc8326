//! Client-facing proposals.
//!
//! A proposal is rendered from a bid's persisted totals plus six prose
//! sections. The prose comes from the generation service, or from a fixed
//! template when generation keeps failing. The rendered document is stored
//! on the bid so the public link can serve exactly what was generated.

mod content;
mod render;
mod response;

pub use content::{
    ProposalSections, SectionEdit, fallback_sections, proposal_prompt, proposal_schema,
};
pub use render::{escape_html, investment_lines, render_proposal_html, render_proposal_text};
pub use response::{
    ProposalResponse, PublicProposal, ResponseSubmission, ResponseType, load_public_proposal,
    submit_response,
};

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::bids::{Bid, BidPatch, BidStatus};
use crate::db::Database;
use crate::error::ProposalError;
use crate::llm::{GenerationService, generate_or_fallback};
use crate::profile::CompanyProfile;
use crate::retry::RetryPolicy;

/// A rendered and stored proposal.
#[derive(Debug, Clone)]
pub struct GeneratedProposal {
    pub bid: Bid,
    pub sections: ProposalSections,
    pub html: String,
    /// True when the fixed template replaced generated prose.
    pub used_fallback: bool,
}

impl GeneratedProposal {
    pub fn plain_text(&self, company: &CompanyProfile, date: NaiveDate) -> String {
        render_proposal_text(&self.bid, &self.sections, company, date)
    }
}

/// Public URL of a shared proposal.
pub fn share_url(public_url: &str, bid_id: Uuid) -> String {
    format!("{}/proposals/{}", public_url.trim_end_matches('/'), bid_id)
}

pub struct ProposalService {
    db: Arc<dyn Database>,
    generator: Arc<dyn GenerationService>,
    policy: RetryPolicy,
}

impl ProposalService {
    pub fn new(
        db: Arc<dyn Database>,
        generator: Arc<dyn GenerationService>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            db,
            generator,
            policy,
        }
    }

    async fn owned_bid(&self, owner: &str, bid_id: Uuid) -> Result<Bid, ProposalError> {
        match self.db.get_bid(bid_id).await? {
            Some(bid) if bid.owner == owner => Ok(bid),
            _ => Err(ProposalError::BidNotFound(bid_id)),
        }
    }

    /// Render and store. A proposal that cannot be stored is reported as an error.
    async fn persist(
        &self,
        mut bid: Bid,
        sections: ProposalSections,
        company: &CompanyProfile,
        date: NaiveDate,
        used_fallback: bool,
    ) -> Result<GeneratedProposal, ProposalError> {
        let html = render_proposal_html(&bid, &sections, company, date);
        bid = self
            .db
            .patch_bid(&bid.owner, bid.id, &BidPatch::proposal_html(html.clone()))
            .await
            .map_err(ProposalError::NotPersisted)?;

        tracing::info!("Stored proposal for bid {}", bid.id);

        Ok(GeneratedProposal {
            bid,
            sections,
            html,
            used_fallback,
        })
    }

    /// Generate prose for a stored bid, render it, and store the document.
    pub async fn generate(
        &self,
        owner: &str,
        bid_id: Uuid,
        company: &CompanyProfile,
        date: NaiveDate,
    ) -> Result<GeneratedProposal, ProposalError> {
        let bid = self.owned_bid(owner, bid_id).await?;

        let generated = generate_or_fallback(
            self.generator.as_ref(),
            &self.policy,
            "Proposal generation",
            &proposal_prompt(&bid, company),
            &proposal_schema(),
            || fallback_sections(&bid, company),
        )
        .await;

        if generated.used_fallback {
            tracing::warn!("Using simplified proposal template for bid {}", bid_id);
        }

        self.persist(bid, generated.value, company, date, generated.used_fallback)
            .await
    }

    /// Re-render after manual edits to the prose and store the result.
    pub async fn apply_edits(
        &self,
        owner: &str,
        bid_id: Uuid,
        mut sections: ProposalSections,
        edits: Vec<SectionEdit>,
        company: &CompanyProfile,
        date: NaiveDate,
    ) -> Result<GeneratedProposal, ProposalError> {
        let bid = self.owned_bid(owner, bid_id).await?;
        for edit in edits {
            sections.apply(edit);
        }
        self.persist(bid, sections, company, date, false).await
    }

    /// Share link for a bid with stored proposal content. A draft bid becomes `sent`.
    pub async fn share(
        &self,
        owner: &str,
        bid_id: Uuid,
        public_url: &str,
    ) -> Result<String, ProposalError> {
        let bid = self.owned_bid(owner, bid_id).await?;
        if bid.proposal_html.as_deref().is_none_or(|h| h.trim().is_empty()) {
            return Err(ProposalError::NotGenerated(bid_id));
        }

        if bid.status() == BidStatus::Draft {
            self.db
                .patch_bid(owner, bid_id, &BidPatch::status(BidStatus::Sent))
                .await?;
            tracing::info!("Bid {} marked as sent", bid_id);
        }

        Ok(share_url(public_url, bid_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bids::example_bid;
    use crate::db::MemoryDatabase;
    use crate::llm::ScriptedGenerator;
    use serde_json::json;
    use std::time::Duration;

    const OWNER: &str = "owner@example.com";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    async fn setup() -> (Arc<MemoryDatabase>, Arc<ScriptedGenerator>, ProposalService, Bid) {
        let db = Arc::new(MemoryDatabase::new());
        let generator = Arc::new(ScriptedGenerator::new());
        let bid = db.create_bid(OWNER, &example_bid().snapshot()).await.unwrap();
        let service = ProposalService::new(
            db.clone(),
            generator.clone(),
            RetryPolicy::linear(3, Duration::from_secs(1)),
        );
        (db, generator, service, bid)
    }

    #[tokio::test(start_paused = true)]
    async fn test_generated_prose_is_stored() {
        let (db, generator, service, bid) = setup().await;
        generator.push_json(json!({
            "executive_summary": "We build kitchens.",
            "scope_of_work": "Everything.",
            "timeline": "Two weeks.",
            "terms_and_conditions": "Standard.",
            "payment_schedule": "Half up front.",
            "closing_statement": "Thanks!"
        }));

        let proposal = service
            .generate(OWNER, bid.id, &CompanyProfile::default(), date())
            .await
            .unwrap();

        assert!(!proposal.used_fallback);
        assert!(proposal.html.contains("We build kitchens."));
        let stored = db.get_bid(bid.id).await.unwrap().unwrap();
        assert_eq!(stored.proposal_html.as_deref(), Some(proposal.html.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_after_three_attempts() {
        let (_db, generator, service, bid) = setup().await;

        let proposal = service
            .generate(OWNER, bid.id, &CompanyProfile::default(), date())
            .await
            .unwrap();

        assert!(proposal.used_fallback);
        assert_eq!(generator.calls(), 3);
        assert!(proposal.html.contains("3-5 business days"));
        assert!(proposal.html.contains("TOTAL INVESTMENT: $6240.00"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failure_is_an_error() {
        let (db, _generator, service, bid) = setup().await;
        db.fail_next_writes(1);

        let result = service
            .generate(OWNER, bid.id, &CompanyProfile::default(), date())
            .await;
        assert!(matches!(result, Err(ProposalError::NotPersisted(_))));
    }

    #[tokio::test]
    async fn test_other_owner_cannot_generate() {
        let (_db, _generator, service, bid) = setup().await;
        let result = service
            .generate("someone@else.com", bid.id, &CompanyProfile::default(), date())
            .await;
        assert!(matches!(result, Err(ProposalError::BidNotFound(_))));
    }

    #[tokio::test]
    async fn test_edits_rerender() {
        let (db, _generator, service, bid) = setup().await;
        let proposal = service
            .apply_edits(
                OWNER,
                bid.id,
                ProposalSections::default(),
                vec![SectionEdit::Timeline("About a month.".into())],
                &CompanyProfile::default(),
                date(),
            )
            .await
            .unwrap();

        assert_eq!(proposal.sections.timeline, "About a month.");
        let stored = db.get_bid(bid.id).await.unwrap().unwrap();
        assert!(stored.proposal_html.unwrap().contains("About a month."));
    }

    #[tokio::test]
    async fn test_share_requires_proposal_and_marks_sent() {
        let (db, _generator, service, bid) = setup().await;

        let result = service.share(OWNER, bid.id, "https://app.test/").await;
        assert!(matches!(result, Err(ProposalError::NotGenerated(_))));

        db.patch_bid(OWNER, bid.id, &BidPatch::proposal_html("<p>hi</p>"))
            .await
            .unwrap();
        let url = service.share(OWNER, bid.id, "https://app.test/").await.unwrap();

        assert_eq!(url, format!("https://app.test/proposals/{}", bid.id));
        let stored = db.get_bid(bid.id).await.unwrap().unwrap();
        assert_eq!(stored.status(), BidStatus::Sent);
    }
}
