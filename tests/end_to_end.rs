//! Bid lifecycle through the public API: price, autosave, share, respond, invoice.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use profitpilot::bids::{
    BidDraft, BidEditor, BidListLoader, BidPatch, BidStatus, EditSession, EditorState,
};
use profitpilot::db::{Database, MemoryDatabase};
use profitpilot::invoices::{Invoice, create_invoice_from_bid};
use profitpilot::notify::LogNotifier;
use profitpilot::pricing::items::MaterialField;
use profitpilot::profile::CompanyProfile;
use profitpilot::proposals::{ResponseSubmission, submit_response};
use profitpilot::retry::RetryPolicy;

const OWNER: &str = "owner@example.com";

fn single_material_draft() -> BidDraft {
    let mut draft = BidDraft {
        client_name: "Jane Doe".into(),
        client_email: "jane@example.com".into(),
        project_title: "Patio".into(),
        ..Default::default()
    };
    let index = draft.costs.materials.add();
    draft
        .costs
        .materials
        .update(index, MaterialField::Quantity("10".into()));
    draft
        .costs
        .materials
        .update(index, MaterialField::CostPerUnit("5".into()));
    draft.set_markup("20");
    draft
}

#[test]
fn test_single_material_bid_totals() {
    let totals = single_material_draft().totals();
    assert_eq!(totals.materials_total, dec!(50));
    assert_eq!(totals.subtotal, dec!(50));
    assert_eq!(totals.markup_amount, dec!(10));
    assert_eq!(totals.total_bid_amount, dec!(60));
    assert_eq!(totals.profit_margin_percentage.round_dp(4), dec!(16.6667));
}

#[test]
fn test_empty_bid_has_zero_totals() {
    let mut draft = BidDraft::default();
    draft.set_markup("25");
    let totals = draft.totals();
    assert_eq!(totals.subtotal, Decimal::ZERO);
    assert_eq!(totals.total_bid_amount, Decimal::ZERO);
    assert_eq!(totals.profit_margin_percentage, Decimal::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_autosave_waits_for_quiet_period() {
    let db = Arc::new(MemoryDatabase::new());
    let session = EditSession::start(db.clone(), OWNER, BidEditor::new(), Duration::from_secs(10));

    session.edit(|d| d.client_name = "Jane".into()).await;
    tokio::time::sleep(Duration::from_secs(12)).await;
    assert!(db.list_bids(OWNER).await.unwrap().is_empty());

    session.edit(|d| d.project_title = "Fence".into()).await;
    tokio::time::sleep(Duration::from_secs(7)).await;
    session.edit(|d| d.project_description = "Cedar".into()).await;
    tokio::time::sleep(Duration::from_secs(7)).await;
    assert!(db.list_bids(OWNER).await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_secs(4)).await;
    let bids = db.list_bids(OWNER).await.unwrap();
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0].draft.project_description, "Cedar");
    assert_eq!(session.editor().await.state(), EditorState::Clean);
    session.close();
}

#[test]
fn test_invoice_lines_follow_bid_totals() {
    let mut bid = profitpilot::bids::example_bid();
    bid.totals.materials_total = dec!(100);
    bid.totals.labor_total = Decimal::ZERO;
    bid.totals.equipment_total = Decimal::ZERO;
    bid.totals.overhead_total = Decimal::ZERO;
    bid.totals.custom_expenses_total = Decimal::ZERO;
    bid.totals.markup_amount = dec!(20);
    bid.totals.total_bid_amount = dec!(120);

    let invoice = Invoice::from_bid(&bid, &CompanyProfile::default(), Utc::now());
    let lines: Vec<(&str, Decimal)> = invoice
        .line_items
        .iter()
        .map(|l| (l.description.as_str(), l.amount))
        .collect();
    assert_eq!(
        lines,
        vec![
            ("Materials & Supplies", dec!(100)),
            ("Project Management & Overhead", dec!(20)),
        ]
    );
    assert_eq!(invoice.subtotal, dec!(120));
}

#[tokio::test(start_paused = true)]
async fn test_client_response_reconciles_bid_status() {
    let db = Arc::new(MemoryDatabase::new());
    let bid = db
        .create_bid(OWNER, &single_material_draft().snapshot())
        .await
        .unwrap();
    db.patch_bid(OWNER, bid.id, &BidPatch::proposal_html("<p>Patio proposal</p>"))
        .await
        .unwrap();

    let submission: ResponseSubmission = serde_json::from_value(serde_json::json!({
        "response_type": "accepted",
        "client_email": "jane@example.com",
        "notes": "Looks good"
    }))
    .unwrap();
    submit_response(db.as_ref(), &LogNotifier, bid.id, submission)
        .await
        .unwrap();

    let loader = BidListLoader::new(db.clone(), RetryPolicy::fixed(3, Duration::from_millis(1500)));
    let list = loader.load(OWNER).await;
    assert!(list.error.is_none());
    assert_eq!(list.bids.len(), 1);
    assert_eq!(list.bids[0].status(), BidStatus::Accepted);
    assert_eq!(
        list.bids[0].change_request_notes.as_deref(),
        Some("Looks good")
    );

    let invoice = create_invoice_from_bid(db.as_ref(), OWNER, bid.id, &CompanyProfile::default())
        .await
        .unwrap();
    assert_eq!(invoice.related_bid_id, Some(bid.id));
    assert_eq!(invoice.total_amount, dec!(60));
    assert_eq!(db.list_invoices(OWNER).await.unwrap().len(), 1);
}
