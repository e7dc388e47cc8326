//! Bid cost aggregation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::custom::CustomExpenses;
use super::items::{EquipmentItem, ItemList, LaborItem, MaterialItem, OverheadItem};
use super::numeric::{checked_sum, percent_of, product};

/// Every line-item collection of a bid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSheet {
    #[serde(default)]
    pub materials: ItemList<MaterialItem>,
    #[serde(default)]
    pub labor_items: ItemList<LaborItem>,
    #[serde(default)]
    pub equipment_items: ItemList<EquipmentItem>,
    #[serde(default)]
    pub overhead_items: ItemList<OverheadItem>,
    #[serde(default)]
    pub custom_expenses: CustomExpenses,
}

impl CostSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the full totals for this sheet at the given markup.
    pub fn totals(&self, markup_percentage: Decimal) -> BidTotals {
        BidTotals::compute(
            self.materials.total(),
            self.labor_items.total(),
            self.equipment_items.total(),
            self.overhead_items.total(),
            self.custom_expenses.total(),
            markup_percentage,
        )
    }
}

/// Derived totals persisted alongside a bid.
///
/// Profit is the markup amount, and the margin is profit over price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidTotals {
    pub materials_total: Decimal,
    pub labor_total: Decimal,
    pub equipment_total: Decimal,
    pub overhead_total: Decimal,
    pub custom_expenses_total: Decimal,
    pub subtotal: Decimal,
    pub markup_amount: Decimal,
    pub total_bid_amount: Decimal,
    pub total_actual_cost: Decimal,
    pub total_profit: Decimal,
    pub profit_margin_percentage: Decimal,
}

impl BidTotals {
    pub fn compute(
        materials_total: Decimal,
        labor_total: Decimal,
        equipment_total: Decimal,
        overhead_total: Decimal,
        custom_expenses_total: Decimal,
        markup_percentage: Decimal,
    ) -> Self {
        let subtotal = checked_sum([
            materials_total,
            labor_total,
            equipment_total,
            overhead_total,
            custom_expenses_total,
        ]);
        let markup_amount = percent_of(subtotal, markup_percentage);
        let total_bid_amount = subtotal.checked_add(markup_amount).unwrap_or(Decimal::ZERO);
        let profit_margin_percentage = if total_bid_amount > Decimal::ZERO {
            markup_amount
                .checked_div(total_bid_amount)
                .map(|ratio| product(ratio, Decimal::ONE_HUNDRED))
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        Self {
            materials_total,
            labor_total,
            equipment_total,
            overhead_total,
            custom_expenses_total,
            subtotal,
            markup_amount,
            total_bid_amount,
            total_actual_cost: subtotal,
            total_profit: markup_amount,
            profit_margin_percentage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::items::{LaborField, MaterialField, UnitCostField};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_single_material_with_markup() {
        let mut sheet = CostSheet::new();
        let idx = sheet.materials.add();
        sheet.materials.update(idx, MaterialField::Quantity("10".into()));
        sheet.materials.update(idx, MaterialField::CostPerUnit("5".into()));

        let totals = sheet.totals(dec!(20));
        assert_eq!(totals.materials_total, dec!(50));
        assert_eq!(totals.subtotal, dec!(50));
        assert_eq!(totals.markup_amount, dec!(10));
        assert_eq!(totals.total_bid_amount, dec!(60));
        assert_eq!(totals.total_profit, dec!(10));
        assert_eq!(totals.profit_margin_percentage.round_dp(4), dec!(16.6667));
    }

    #[test]
    fn test_empty_sheet_is_all_zero() {
        let totals = CostSheet::new().totals(dec!(25));
        assert_eq!(totals, BidTotals::default());
    }

    #[test]
    fn test_subtotal_sums_every_category() {
        let mut sheet = CostSheet::new();
        let m = sheet.materials.add();
        sheet.materials.update(m, MaterialField::Quantity("4".into()));
        sheet.materials.update(m, MaterialField::CostPerUnit("25".into()));
        let l = sheet.labor_items.add();
        sheet.labor_items.update(l, LaborField::Hours("10".into()));
        sheet.labor_items.update(l, LaborField::CostPerHour("30".into()));
        let o = sheet.overhead_items.add();
        sheet.overhead_items.update(o, UnitCostField::Quantity("1".into()));
        sheet.overhead_items.update(o, UnitCostField::CostPerUnit("40".into()));
        let c = sheet.custom_expenses.add_category("Permits").unwrap();
        let i = sheet.custom_expenses.add_item(c).unwrap();
        sheet.custom_expenses.update_item(c, i, UnitCostField::Quantity("1".into()));
        sheet.custom_expenses.update_item(c, i, UnitCostField::CostPerUnit("60".into()));

        let totals = sheet.totals(dec!(10));
        assert_eq!(totals.subtotal, dec!(500));
        assert_eq!(
            totals.subtotal,
            totals.materials_total
                + totals.labor_total
                + totals.equipment_total
                + totals.overhead_total
                + totals.custom_expenses_total
        );
        assert_eq!(totals.total_bid_amount, dec!(550));
        assert_eq!(totals.total_actual_cost, totals.subtotal);

        // Recomputing is side-effect free.
        assert_eq!(sheet.totals(dec!(10)), totals);
    }

    #[test]
    fn test_overflowing_items_degrade_to_zero() {
        let huge = "79228162514264337593543950335";
        let mut sheet = CostSheet::new();
        for _ in 0..2 {
            let idx = sheet.materials.add();
            sheet.materials.update(idx, MaterialField::Quantity(huge.into()));
            sheet.materials.update(idx, MaterialField::CostPerUnit("1".into()));
        }
        let c = sheet.custom_expenses.add_category("Permits").unwrap();
        for _ in 0..2 {
            let i = sheet.custom_expenses.add_item(c).unwrap();
            sheet.custom_expenses.update_item(c, i, UnitCostField::Quantity(huge.into()));
            sheet.custom_expenses.update_item(c, i, UnitCostField::CostPerUnit("1".into()));
        }

        let totals = sheet.totals(dec!(20));
        assert_eq!(totals.materials_total, Decimal::ZERO);
        assert_eq!(totals.custom_expenses_total, Decimal::ZERO);
        assert_eq!(totals.total_bid_amount, Decimal::ZERO);
    }

    #[test]
    fn test_overflowing_category_sum_degrades_to_zero() {
        let totals =
            BidTotals::compute(Decimal::MAX, Decimal::MAX, dec!(0), dec!(0), dec!(0), dec!(20));
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total_bid_amount, Decimal::ZERO);

        // Subtotal fits but adding the markup does not.
        let totals = BidTotals::compute(Decimal::MAX, dec!(0), dec!(0), dec!(0), dec!(0), dec!(50));
        assert_eq!(totals.subtotal, Decimal::MAX);
        assert_eq!(totals.total_bid_amount, Decimal::ZERO);
        assert_eq!(totals.profit_margin_percentage, Decimal::ZERO);
    }

    #[test]
    fn test_zero_markup_has_zero_margin() {
        let totals = BidTotals::compute(dec!(100), dec!(0), dec!(0), dec!(0), dec!(0), dec!(0));
        assert_eq!(totals.total_bid_amount, dec!(100));
        assert_eq!(totals.profit_margin_percentage, Decimal::ZERO);
    }
}
