//! Invoice derivation and editing.
//!
//! An invoice is created from a bid's persisted totals and is independent of
//! the bid afterwards. The derived subtotal is copied from the bid's price;
//! once the owner edits line items the subtotal is re-summed from them.

use chrono::{DateTime, Days, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bids::Bid;
use crate::db::Database;
use crate::error::DatabaseError;
use crate::pricing::BidTotals;
use crate::pricing::numeric::{checked_sum, coerce, percent_of};
use crate::profile::{CompanyProfile, digits_only};

pub const PAYMENT_TERMS_DAYS: u64 = 30;
pub const DEFAULT_NOTES: &str = "Thank you for your business!";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub amount: Decimal,
}

impl InvoiceLine {
    pub fn new(description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            description: description.into(),
            amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvoiceLineField {
    Description(String),
    Amount(String),
}

/// Company details frozen onto the invoice when it is created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanySnapshot {
    pub company_name: String,
    pub company_address: String,
    /// Digits only.
    pub company_phone: String,
    pub company_email: String,
    pub company_website: String,
    pub company_logo_url: String,
}

impl From<&CompanyProfile> for CompanySnapshot {
    fn from(company: &CompanyProfile) -> Self {
        Self {
            company_name: company.company_name.clone(),
            company_address: company.address.clone(),
            company_phone: digits_only(&company.phone),
            company_email: company.email.clone(),
            company_website: company.website.clone(),
            company_logo_url: company.logo_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub owner: String,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub client_name: String,
    pub client_email: String,
    pub project_title: String,
    pub line_items: Vec<InvoiceLine>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub notes: String,
    #[serde(default)]
    pub related_bid_id: Option<Uuid>,
    #[serde(flatten)]
    pub company: CompanySnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line per category total that is greater than zero, in a fixed order.
pub fn derive_line_items(totals: &BidTotals) -> Vec<InvoiceLine> {
    [
        ("Materials & Supplies", totals.materials_total),
        ("Labor & Services", totals.labor_total),
        ("Equipment Rental", totals.equipment_total),
        ("Overhead & Admin", totals.overhead_total),
        ("Other Direct Costs", totals.custom_expenses_total),
        ("Project Management & Overhead", totals.markup_amount),
    ]
    .into_iter()
    .filter(|(_, amount)| *amount > Decimal::ZERO)
    .map(|(label, amount)| InvoiceLine::new(label, amount))
    .collect()
}

/// `INV-` + the last six digits of the millisecond timestamp + a two-digit suffix.
pub fn invoice_number(now: DateTime<Utc>, suffix: u8) -> String {
    let millis = now.timestamp_millis().unsigned_abs() % 1_000_000;
    format!("INV-{:06}-{:02}", millis, suffix % 100)
}

fn next_invoice_number(now: DateTime<Utc>) -> String {
    let suffix = rand::thread_rng().gen_range(0..100u8);
    invoice_number(now, suffix)
}

impl Invoice {
    /// Derive a draft invoice from a bid.
    pub fn from_bid(bid: &Bid, company: &CompanyProfile, now: DateTime<Utc>) -> Self {
        let issue_date = now.date_naive();
        let due_date = issue_date
            .checked_add_days(Days::new(PAYMENT_TERMS_DAYS))
            .unwrap_or(issue_date);
        let subtotal = bid.totals.total_bid_amount;

        Self {
            id: Uuid::new_v4(),
            owner: bid.owner.clone(),
            invoice_number: next_invoice_number(now),
            status: InvoiceStatus::Draft,
            issue_date,
            due_date,
            client_name: bid.draft.client_name.clone(),
            client_email: bid.draft.client_email.clone(),
            project_title: bid.draft.project_title.clone(),
            line_items: derive_line_items(&bid.totals),
            subtotal,
            tax_rate: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            total_amount: subtotal,
            notes: DEFAULT_NOTES.to_string(),
            related_bid_id: Some(bid.id),
            company: CompanySnapshot::from(company),
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the tax rate from user input and recompute tax and total.
    pub fn set_tax_rate(&mut self, input: &str) {
        self.tax_rate = coerce(input);
        self.recompute_tax();
    }

    pub fn add_line(&mut self) -> usize {
        self.line_items.push(InvoiceLine::new("", Decimal::ZERO));
        self.resum();
        self.line_items.len() - 1
    }

    pub fn update_line(&mut self, index: usize, field: InvoiceLineField) -> bool {
        let Some(line) = self.line_items.get_mut(index) else {
            return false;
        };
        match field {
            InvoiceLineField::Description(v) => line.description = v,
            InvoiceLineField::Amount(v) => line.amount = coerce(&v),
        }
        self.resum();
        true
    }

    pub fn remove_line(&mut self, index: usize) -> Option<InvoiceLine> {
        if index >= self.line_items.len() {
            return None;
        }
        let removed = self.line_items.remove(index);
        self.resum();
        Some(removed)
    }

    pub fn line_items_total(&self) -> Decimal {
        checked_sum(self.line_items.iter().map(|l| l.amount))
    }

    fn resum(&mut self) {
        self.subtotal = self.line_items_total();
        self.recompute_tax();
    }

    fn recompute_tax(&mut self) {
        self.tax_amount = percent_of(self.subtotal, self.tax_rate);
        self.total_amount = checked_sum([self.subtotal, self.tax_amount]);
    }

    pub fn mark_paid(&mut self) {
        self.status = InvoiceStatus::Paid;
    }

    /// Undo a paid mark. The invoice goes back to draft.
    pub fn mark_unpaid(&mut self) {
        self.status = InvoiceStatus::Draft;
    }

    /// Unpaid and past its due date.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != InvoiceStatus::Paid && today > self.due_date
    }

    /// Flip a sent invoice to overdue once it passes its due date.
    pub fn refresh_overdue(&mut self, today: NaiveDate) -> bool {
        if self.status == InvoiceStatus::Sent && self.is_overdue(today) {
            self.status = InvoiceStatus::Overdue;
            return true;
        }
        false
    }
}

/// Create and store an invoice for one of the owner's bids.
pub async fn create_invoice_from_bid(
    db: &dyn Database,
    owner: &str,
    bid_id: Uuid,
    company: &CompanyProfile,
) -> Result<Invoice, DatabaseError> {
    let bid = db
        .get_bid(bid_id)
        .await?
        .filter(|b| b.owner == owner)
        .ok_or(DatabaseError::NotFound {
            entity: "bid",
            id: bid_id,
        })?;

    let invoice = Invoice::from_bid(&bid, company, Utc::now());
    db.create_invoice(&invoice).await?;
    tracing::info!(
        "Created invoice {} from bid {} ({} line items)",
        invoice.invoice_number,
        bid_id,
        invoice.line_items.len()
    );
    Ok(invoice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bids::{BidDraft, BidSnapshot};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn bid_with(totals: BidTotals) -> Bid {
        let draft = BidDraft {
            client_name: "Sam".into(),
            client_email: "sam@example.com".into(),
            project_title: "Fence".into(),
            ..Default::default()
        };
        Bid::new("owner", BidSnapshot { draft, totals })
    }

    #[test]
    fn test_two_category_invoice() {
        let totals = BidTotals::compute(dec!(100), dec!(0), dec!(0), dec!(0), dec!(0), dec!(20));
        assert_eq!(totals.markup_amount, dec!(20));
        let bid = bid_with(totals);

        let invoice = Invoice::from_bid(&bid, &CompanyProfile::default(), Utc::now());
        assert_eq!(
            invoice.line_items,
            vec![
                InvoiceLine::new("Materials & Supplies", dec!(100)),
                InvoiceLine::new("Project Management & Overhead", dec!(20)),
            ]
        );
        assert_eq!(invoice.subtotal, dec!(120));
        assert_eq!(invoice.total_amount, dec!(120));
        assert_eq!(invoice.line_items_total(), bid.totals.total_bid_amount);
        assert_eq!(invoice.related_bid_id, Some(bid.id));
        assert_eq!(invoice.notes, DEFAULT_NOTES);
    }

    #[test]
    fn test_every_category_sums_to_price() {
        let totals =
            BidTotals::compute(dec!(10), dec!(20), dec!(30), dec!(40), dec!(50), dec!(12.5));
        let lines = derive_line_items(&totals);
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[4].description, "Other Direct Costs");
        let sum: Decimal = lines.iter().map(|l| l.amount).sum();
        assert_eq!(sum, totals.total_bid_amount);
    }

    #[test]
    fn test_dates_and_number() {
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        let bid = bid_with(BidTotals::default());
        let company = CompanyProfile {
            phone: "(555) 123-4567".into(),
            ..Default::default()
        };
        let invoice = Invoice::from_bid(&bid, &company, now);

        assert_eq!(invoice.issue_date, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
        assert_eq!(invoice.due_date, NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert!(invoice.invoice_number.starts_with("INV-"));
        assert_eq!(invoice.company.company_phone, "5551234567");
        assert!(invoice.line_items.is_empty());

        let millis = now.timestamp_millis() % 1_000_000;
        assert_eq!(invoice_number(now, 7), format!("INV-{:06}-07", millis));
    }

    #[test]
    fn test_tax_and_line_edits() {
        let totals = BidTotals::compute(dec!(100), dec!(0), dec!(0), dec!(0), dec!(0), dec!(20));
        let mut invoice = Invoice::from_bid(&bid_with(totals), &CompanyProfile::default(), Utc::now());

        invoice.set_tax_rate("8.25");
        assert_eq!(invoice.tax_amount, dec!(9.90));
        assert_eq!(invoice.total_amount, dec!(129.90));

        let idx = invoice.add_line();
        invoice.update_line(idx, InvoiceLineField::Description("Permit".into()));
        invoice.update_line(idx, InvoiceLineField::Amount("30".into()));
        assert_eq!(invoice.subtotal, dec!(150));
        assert_eq!(invoice.total_amount, dec!(162.375));

        invoice.remove_line(0);
        assert_eq!(invoice.subtotal, dec!(50));
        assert!(!invoice.update_line(9, InvoiceLineField::Amount("1".into())));
    }

    #[test]
    fn test_overflowing_line_amounts_degrade_to_zero() {
        let mut invoice =
            Invoice::from_bid(&bid_with(BidTotals::default()), &CompanyProfile::default(), Utc::now());
        for _ in 0..2 {
            let idx = invoice.add_line();
            invoice.update_line(
                idx,
                InvoiceLineField::Amount("79228162514264337593543950335".into()),
            );
        }
        assert_eq!(invoice.subtotal, Decimal::ZERO);
        assert_eq!(invoice.total_amount, Decimal::ZERO);
    }

    #[test]
    fn test_overdue_and_paid() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut invoice =
            Invoice::from_bid(&bid_with(BidTotals::default()), &CompanyProfile::default(), now);
        let late = NaiveDate::from_ymd_opt(2025, 2, 15).unwrap();

        assert!(!invoice.refresh_overdue(late));
        invoice.status = InvoiceStatus::Sent;
        assert!(invoice.refresh_overdue(late));
        assert_eq!(invoice.status, InvoiceStatus::Overdue);

        invoice.mark_paid();
        assert!(!invoice.is_overdue(late));
        invoice.mark_unpaid();
        assert_eq!(invoice.status, InvoiceStatus::Draft);
    }
}
