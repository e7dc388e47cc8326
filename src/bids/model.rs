//! Bid aggregate.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pricing::numeric::product;
use crate::pricing::{
    BidTotals, CostSheet, EquipmentItem, LaborItem, MaterialItem, UnitCostField, UnitCostItem,
    coerce,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BidStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    Rejected,
    ChangesRequested,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::ChangesRequested => "changes_requested",
        }
    }
}

impl std::fmt::Display for BidStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The user-editable part of a bid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidDraft {
    pub client_name: String,
    pub client_email: String,
    pub project_title: String,
    pub project_description: String,
    #[serde(flatten)]
    pub costs: CostSheet,
    pub markup_percentage: Decimal,
    pub status: BidStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
}

impl Default for BidDraft {
    fn default() -> Self {
        Self {
            client_name: String::new(),
            client_email: String::new(),
            project_title: String::new(),
            project_description: String::new(),
            costs: CostSheet::new(),
            markup_percentage: dec!(20),
            status: BidStatus::Draft,
            notes: String::new(),
            valid_until: None,
        }
    }
}

impl BidDraft {
    /// Set the markup from user input, coercing invalid text to zero.
    pub fn set_markup(&mut self, input: &str) {
        self.markup_percentage = coerce(input);
    }

    pub fn totals(&self) -> BidTotals {
        self.costs.totals(self.markup_percentage)
    }

    /// A draft paired with its freshly computed totals.
    pub fn snapshot(&self) -> BidSnapshot {
        BidSnapshot {
            draft: self.clone(),
            totals: self.totals(),
        }
    }
}

/// What gets written to the store: the draft and its totals, computed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidSnapshot {
    #[serde(flatten)]
    pub draft: BidDraft,
    #[serde(flatten)]
    pub totals: BidTotals,
}

/// A stored bid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub owner: String,
    #[serde(flatten)]
    pub draft: BidDraft,
    #[serde(flatten)]
    pub totals: BidTotals,
    #[serde(default)]
    pub proposal_html: Option<String>,
    #[serde(default)]
    pub change_request_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Set only on the built-in example bid, which is never persisted.
    #[serde(default)]
    pub is_example: bool,
}

impl Bid {
    pub fn new(owner: impl Into<String>, snapshot: BidSnapshot) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            draft: snapshot.draft,
            totals: snapshot.totals,
            proposal_html: None,
            change_request_notes: None,
            created_at: now,
            updated_at: now,
            is_example: false,
        }
    }

    pub fn status(&self) -> BidStatus {
        self.draft.status
    }

    pub fn title(&self) -> &str {
        &self.draft.project_title
    }

    /// The stored draft and totals, as last written.
    pub fn snapshot(&self) -> BidSnapshot {
        BidSnapshot {
            draft: self.draft.clone(),
            totals: self.totals,
        }
    }

    /// Overwrite the editable fields and totals.
    pub fn replace(&mut self, snapshot: BidSnapshot) {
        self.draft = snapshot.draft;
        self.totals = snapshot.totals;
        self.updated_at = Utc::now();
    }

    /// Apply a partial update. `None` fields are left alone.
    pub fn apply_patch(&mut self, patch: &BidPatch) {
        if let Some(status) = patch.status {
            self.draft.status = status;
        }
        if let Some(notes) = &patch.change_request_notes {
            self.change_request_notes = Some(notes.clone());
        }
        if let Some(html) = &patch.proposal_html {
            self.proposal_html = Some(html.clone());
        }
        self.updated_at = Utc::now();
    }
}

/// Partial update for fields written outside the bid editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BidPatch {
    pub status: Option<BidStatus>,
    pub change_request_notes: Option<String>,
    pub proposal_html: Option<String>,
}

impl BidPatch {
    pub fn status(status: BidStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn proposal_html(html: impl Into<String>) -> Self {
        Self {
            proposal_html: Some(html.into()),
            ..Default::default()
        }
    }
}

fn unit_cost(description: &str, quantity: Decimal, unit: &str, cost_per_unit: Decimal) -> UnitCostItem {
    UnitCostItem {
        description: description.to_string(),
        quantity,
        unit: unit.to_string(),
        cost_per_unit,
        actual_cost: product(quantity, cost_per_unit),
    }
}

fn example_costs() -> CostSheet {
    let mut costs = CostSheet::new();
    costs.materials.push(MaterialItem {
        name: "Cabinets and countertops".to_string(),
        quantity: dec!(100),
        unit: "sq ft".to_string(),
        cost_per_unit: dec!(25),
        actual_cost: product(dec!(100), dec!(25)),
    });
    costs.labor_items.push(LaborItem {
        description: "Installation crew".to_string(),
        hours: dec!(60),
        cost_per_hour: dec!(30),
        actual_cost: product(dec!(60), dec!(30)),
    });
    costs.equipment_items.push(EquipmentItem {
        name: "Tile saw".to_string(),
        rental_duration: dec!(2),
        rental_unit: "day".to_string(),
        cost_per_unit: dec!(200),
        actual_cost: product(dec!(2), dec!(200)),
    });
    costs
        .overhead_items
        .push(unit_cost("Site cleanup", dec!(1), "each", dec!(200)));
    if let Ok(category) = costs.custom_expenses.add_category("Permits") {
        if let Some(item) = costs.custom_expenses.add_item(category) {
            for field in [
                UnitCostField::Description("Building permit".to_string()),
                UnitCostField::Quantity("1".to_string()),
                UnitCostField::CostPerUnit("300".to_string()),
            ] {
                costs.custom_expenses.update_item(category, item, field);
            }
        }
    }
    costs
}

/// Placeholder bid shown when the owner has no bids yet.
pub fn example_bid() -> Bid {
    let now = Utc::now();
    let draft = BidDraft {
        client_name: "Demo Client".to_string(),
        project_title: "Sample Kitchen Renovation".to_string(),
        project_description: "This is an example bid to show you how the system works. \
            Create your first real bid to get started!"
            .to_string(),
        costs: example_costs(),
        markup_percentage: dec!(20),
        ..Default::default()
    };
    let totals = draft.totals();

    Bid {
        id: Uuid::nil(),
        owner: String::new(),
        draft,
        totals,
        proposal_html: None,
        change_request_notes: None,
        created_at: now,
        updated_at: now,
        is_example: true,
    }
}
