//! Bid cost and pricing core.
//!
//! Line items carry their own `actual_cost`, collections sum them, and
//! [`CostSheet::totals`] turns the collections plus a markup percentage into
//! the persisted [`BidTotals`].

pub mod custom;
pub mod items;
pub mod numeric;
pub mod rates;
pub mod totals;

pub use custom::{CustomExpenseCategory, CustomExpenses};
pub use items::{
    CustomExpenseItem, EquipmentField, EquipmentItem, ItemList, LaborField, LaborItem, LineItem,
    MaterialField, MaterialItem, OverheadItem, UnitCostField, UnitCostItem,
};
pub use numeric::{coerce, parse_strict};
pub use rates::{NewRate, RateCategory, RateEntry, rate_margin};
pub use totals::{BidTotals, CostSheet};
