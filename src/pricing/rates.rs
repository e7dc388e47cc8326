//! Rate catalog: reusable unit prices that seed bid line items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which bid collection a rate is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateCategory {
    Materials,
    Labor,
    Equipment,
    Overhead,
}

impl RateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Materials => "materials",
            Self::Labor => "labor",
            Self::Equipment => "equipment",
            Self::Overhead => "overhead",
        }
    }

    /// Parse a category name, accepting any casing. Unknown names are `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "materials" | "material" => Some(Self::Materials),
            "labor" | "labour" => Some(Self::Labor),
            "equipment" => Some(Self::Equipment),
            "overhead" => Some(Self::Overhead),
            _ => None,
        }
    }
}

impl std::fmt::Display for RateCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields a user supplies when creating or editing a rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRate {
    pub name: String,
    pub category: RateCategory,
    pub unit: String,
    pub cost_per_unit: Decimal,
    pub charge_per_unit: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    /// Default quantity when seeding material, equipment or overhead items.
    #[serde(default)]
    pub quantity: Option<Decimal>,
    /// Default hours when seeding labor items.
    #[serde(default)]
    pub hours: Option<Decimal>,
}

impl NewRate {
    pub fn new(
        name: impl Into<String>,
        category: RateCategory,
        unit: impl Into<String>,
        cost_per_unit: Decimal,
        charge_per_unit: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            unit: unit.into(),
            cost_per_unit,
            charge_per_unit,
            description: None,
            quantity: None,
            hours: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The margin stored alongside this rate.
    pub fn profit_margin(&self) -> Decimal {
        rate_margin(self.cost_per_unit, self.charge_per_unit)
    }
}

/// A stored rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateEntry {
    pub id: Uuid,
    pub owner: String,
    #[serde(flatten)]
    pub rate: NewRate,
    /// Derived from cost and charge when the rate is written.
    pub profit_margin: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RateEntry {
    pub fn new(owner: impl Into<String>, rate: NewRate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner: owner.into(),
            profit_margin: rate.profit_margin(),
            rate,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the editable fields, recomputing the stored margin.
    pub fn apply(&mut self, rate: NewRate) {
        self.profit_margin = rate.profit_margin();
        self.rate = rate;
        self.updated_at = Utc::now();
    }

    pub fn name(&self) -> &str {
        &self.rate.name
    }

    pub fn category(&self) -> RateCategory {
        self.rate.category
    }
}

/// Margin on charge: `(charge - cost) / charge * 100`, zero when either side is zero.
pub fn rate_margin(cost: Decimal, charge: Decimal) -> Decimal {
    if cost.is_zero() || charge.is_zero() {
        return Decimal::ZERO;
    }
    (charge - cost) / charge * Decimal::ONE_HUNDRED
}

/// Find a rate by id.
pub fn find_rate(rates: &[RateEntry], id: Uuid) -> Option<&RateEntry> {
    rates.iter().find(|r| r.id == id)
}
