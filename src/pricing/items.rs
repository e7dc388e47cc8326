//! Typed bid line items and the ordered collections that hold them.
//!
//! Every item kind has two cost-driving factors. Editing either factor
//! recomputes `actual_cost` as their product; editing anything else leaves
//! `actual_cost` untouched. Numeric input is coerced, never rejected.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::numeric::{checked_sum, coerce, product};
use super::rates::{RateEntry, find_rate};

/// Behaviour shared by every line-item kind.
pub trait LineItem: Clone + Default {
    /// The editable fields of this kind.
    type Field;

    /// Set one field, recomputing `actual_cost` when a factor changed.
    fn apply(&mut self, field: Self::Field);

    fn actual_cost(&self) -> Decimal;

    /// Seed a new item from a catalog rate.
    fn from_rate(rate: &RateEntry) -> Self;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialItem {
    pub name: String,
    pub quantity: Decimal,
    pub unit: String,
    pub cost_per_unit: Decimal,
    pub actual_cost: Decimal,
}

impl Default for MaterialItem {
    fn default() -> Self {
        Self {
            name: String::new(),
            quantity: Decimal::ZERO,
            unit: "sq ft".to_string(),
            cost_per_unit: Decimal::ZERO,
            actual_cost: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaterialField {
    Name(String),
    Quantity(String),
    Unit(String),
    CostPerUnit(String),
}

impl LineItem for MaterialItem {
    type Field = MaterialField;

    fn apply(&mut self, field: MaterialField) {
        match field {
            MaterialField::Name(v) => self.name = v,
            MaterialField::Unit(v) => self.unit = v,
            MaterialField::Quantity(v) => {
                self.quantity = coerce(&v);
                self.actual_cost = product(self.quantity, self.cost_per_unit);
            }
            MaterialField::CostPerUnit(v) => {
                self.cost_per_unit = coerce(&v);
                self.actual_cost = product(self.quantity, self.cost_per_unit);
            }
        }
    }

    fn actual_cost(&self) -> Decimal {
        self.actual_cost
    }

    fn from_rate(rate: &RateEntry) -> Self {
        let quantity = rate.rate.quantity.unwrap_or(Decimal::ONE);
        Self {
            name: rate.rate.name.clone(),
            quantity,
            unit: rate.rate.unit.clone(),
            cost_per_unit: rate.rate.cost_per_unit,
            actual_cost: product(quantity, rate.rate.cost_per_unit),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LaborItem {
    pub description: String,
    pub hours: Decimal,
    pub cost_per_hour: Decimal,
    pub actual_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaborField {
    Description(String),
    Hours(String),
    CostPerHour(String),
}

impl LineItem for LaborItem {
    type Field = LaborField;

    fn apply(&mut self, field: LaborField) {
        match field {
            LaborField::Description(v) => self.description = v,
            LaborField::Hours(v) => {
                self.hours = coerce(&v);
                self.actual_cost = product(self.hours, self.cost_per_hour);
            }
            LaborField::CostPerHour(v) => {
                self.cost_per_hour = coerce(&v);
                self.actual_cost = product(self.hours, self.cost_per_hour);
            }
        }
    }

    fn actual_cost(&self) -> Decimal {
        self.actual_cost
    }

    fn from_rate(rate: &RateEntry) -> Self {
        let hours = rate.rate.hours.unwrap_or(Decimal::ONE);
        Self {
            description: rate.rate.name.clone(),
            hours,
            cost_per_hour: rate.rate.cost_per_unit,
            actual_cost: product(hours, rate.rate.cost_per_unit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentItem {
    pub name: String,
    pub rental_duration: Decimal,
    pub rental_unit: String,
    pub cost_per_unit: Decimal,
    pub actual_cost: Decimal,
}

impl Default for EquipmentItem {
    fn default() -> Self {
        Self {
            name: String::new(),
            rental_duration: Decimal::ZERO,
            rental_unit: "day".to_string(),
            cost_per_unit: Decimal::ZERO,
            actual_cost: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquipmentField {
    Name(String),
    RentalDuration(String),
    RentalUnit(String),
    CostPerUnit(String),
}

impl LineItem for EquipmentItem {
    type Field = EquipmentField;

    fn apply(&mut self, field: EquipmentField) {
        match field {
            EquipmentField::Name(v) => self.name = v,
            EquipmentField::RentalUnit(v) => self.rental_unit = v,
            EquipmentField::RentalDuration(v) => {
                self.rental_duration = coerce(&v);
                self.actual_cost = product(self.rental_duration, self.cost_per_unit);
            }
            EquipmentField::CostPerUnit(v) => {
                self.cost_per_unit = coerce(&v);
                self.actual_cost = product(self.rental_duration, self.cost_per_unit);
            }
        }
    }

    fn actual_cost(&self) -> Decimal {
        self.actual_cost
    }

    fn from_rate(rate: &RateEntry) -> Self {
        let rental_unit = if rate.rate.unit.trim().is_empty() {
            "day".to_string()
        } else {
            rate.rate.unit.clone()
        };
        let rental_duration = rate.rate.quantity.unwrap_or(Decimal::ONE);
        Self {
            name: rate.rate.name.clone(),
            rental_duration,
            rental_unit,
            cost_per_unit: rate.rate.cost_per_unit,
            actual_cost: product(rental_duration, rate.rate.cost_per_unit),
        }
    }
}

/// Quantity × unit cost item, used for overhead and custom expense lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCostItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit: String,
    pub cost_per_unit: Decimal,
    pub actual_cost: Decimal,
}

pub type OverheadItem = UnitCostItem;
pub type CustomExpenseItem = UnitCostItem;

impl Default for UnitCostItem {
    fn default() -> Self {
        Self {
            description: String::new(),
            quantity: Decimal::ZERO,
            unit: "each".to_string(),
            cost_per_unit: Decimal::ZERO,
            actual_cost: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitCostField {
    Description(String),
    Quantity(String),
    Unit(String),
    CostPerUnit(String),
}

impl LineItem for UnitCostItem {
    type Field = UnitCostField;

    fn apply(&mut self, field: UnitCostField) {
        match field {
            UnitCostField::Description(v) => self.description = v,
            UnitCostField::Unit(v) => self.unit = v,
            UnitCostField::Quantity(v) => {
                self.quantity = coerce(&v);
                self.actual_cost = product(self.quantity, self.cost_per_unit);
            }
            UnitCostField::CostPerUnit(v) => {
                self.cost_per_unit = coerce(&v);
                self.actual_cost = product(self.quantity, self.cost_per_unit);
            }
        }
    }

    fn actual_cost(&self) -> Decimal {
        self.actual_cost
    }

    fn from_rate(rate: &RateEntry) -> Self {
        let quantity = rate.rate.quantity.unwrap_or(Decimal::ONE);
        Self {
            description: rate.rate.name.clone(),
            quantity,
            unit: rate.rate.unit.clone(),
            cost_per_unit: rate.rate.cost_per_unit,
            actual_cost: product(quantity, rate.rate.cost_per_unit),
        }
    }
}

/// An ordered, index-addressed sequence of line items.
///
/// Out-of-range indices are ignored and reported by returning `false`/`None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemList<T> {
    items: Vec<T>,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> From<Vec<T>> for ItemList<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T: LineItem> ItemList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a blank item. Returns its index.
    pub fn add(&mut self) -> usize {
        self.items.push(T::default());
        self.items.len() - 1
    }

    pub fn update(&mut self, index: usize, field: T::Field) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                item.apply(field);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    /// Insert a copy of the item at `index` directly after it.
    pub fn duplicate(&mut self, index: usize) -> bool {
        match self.items.get(index).cloned() {
            Some(copy) => {
                self.items.insert(index + 1, copy);
                true
            }
            None => false,
        }
    }

    /// Append an item seeded from the rate with `rate_id`. Unknown ids are a no-op.
    pub fn add_from_rate(&mut self, rates: &[RateEntry], rate_id: Uuid) -> Option<usize> {
        let rate = find_rate(rates, rate_id)?;
        self.items.push(T::from_rate(rate));
        Some(self.items.len() - 1)
    }

    pub fn total(&self) -> Decimal {
        checked_sum(self.items.iter().map(|item| item.actual_cost()))
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }
}

impl<T> ItemList<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::rates::{NewRate, RateCategory};
    use rust_decimal_macros::dec;

    fn material(quantity: &str, cost: &str) -> MaterialItem {
        let mut item = MaterialItem::default();
        item.apply(MaterialField::Quantity(quantity.into()));
        item.apply(MaterialField::CostPerUnit(cost.into()));
        item
    }

    #[test]
    fn test_factor_edit_recomputes_cost() {
        let item = material("10", "5");
        assert_eq!(item.actual_cost, dec!(50));
    }

    #[test]
    fn test_non_numeric_factor_is_zero() {
        let item = material("ten", "5");
        assert_eq!(item.quantity, Decimal::ZERO);
        assert_eq!(item.actual_cost, Decimal::ZERO);

        let item = material("", "");
        assert_eq!(item.actual_cost, Decimal::ZERO);
    }

    #[test]
    fn test_non_factor_edit_keeps_cost() {
        let mut item = material("2", "3");
        item.apply(MaterialField::Name("Lumber".into()));
        item.apply(MaterialField::Unit("board".into()));
        assert_eq!(item.actual_cost, dec!(6));
    }

    #[test]
    fn test_labor_and_equipment_factors() {
        let mut labor = LaborItem::default();
        labor.apply(LaborField::Hours("8".into()));
        labor.apply(LaborField::CostPerHour("45.50".into()));
        assert_eq!(labor.actual_cost, dec!(364.00));

        let mut rental = EquipmentItem::default();
        assert_eq!(rental.rental_unit, "day");
        rental.apply(EquipmentField::RentalDuration("3".into()));
        rental.apply(EquipmentField::CostPerUnit("120".into()));
        assert_eq!(rental.actual_cost, dec!(360));
    }

    #[test]
    fn test_duplicate_inserts_after_source() {
        let mut list: ItemList<MaterialItem> = ItemList::new();
        list.push(material("1", "1"));
        list.push(material("2", "2"));
        list.push(material("3", "3"));

        assert!(list.duplicate(1));
        let costs: Vec<Decimal> = list.iter().map(|i| i.actual_cost).collect();
        assert_eq!(costs, vec![dec!(1), dec!(4), dec!(4), dec!(9)]);
        assert_eq!(list.get(1), list.get(2));
        assert!(!list.duplicate(10));
    }

    #[test]
    fn test_remove_keeps_order() {
        let mut list: ItemList<MaterialItem> = ItemList::new();
        list.push(material("1", "1"));
        list.push(material("2", "1"));
        list.push(material("3", "1"));

        assert!(list.remove(0).is_some());
        assert!(list.remove(5).is_none());
        let qty: Vec<Decimal> = list.iter().map(|i| i.quantity).collect();
        assert_eq!(qty, vec![dec!(2), dec!(3)]);
        assert_eq!(list.total(), dec!(5));
    }

    #[test]
    fn test_add_from_rate_defaults() {
        let rate = RateEntry::new(
            "owner",
            NewRate::new("Electrician", RateCategory::Labor, "hour", dec!(65), dec!(95)),
        );
        let mut crane = NewRate::new("Crane", RateCategory::Equipment, "", dec!(300), dec!(450));
        crane.quantity = Some(dec!(2));
        let crane = RateEntry::new("owner", crane);
        let rates = vec![rate.clone(), crane.clone()];

        let mut labor: ItemList<LaborItem> = ItemList::new();
        assert_eq!(labor.add_from_rate(&rates, rate.id), Some(0));
        let seeded = labor.get(0).unwrap();
        assert_eq!(seeded.description, "Electrician");
        assert_eq!(seeded.hours, dec!(1));
        assert_eq!(seeded.cost_per_hour, dec!(65));
        assert_eq!(seeded.actual_cost, dec!(65));

        let mut equipment: ItemList<EquipmentItem> = ItemList::new();
        equipment.add_from_rate(&rates, crane.id);
        let seeded = equipment.get(0).unwrap();
        assert_eq!(seeded.rental_unit, "day");
        assert_eq!(seeded.rental_duration, dec!(2));
        assert_eq!(seeded.actual_cost, dec!(600));

        assert_eq!(labor.add_from_rate(&rates, Uuid::new_v4()), None);
        assert_eq!(labor.len(), 1);
    }

    #[test]
    fn test_seeded_cost_is_quantity_times_unit_cost() {
        let mut tile = NewRate::new("Tile", RateCategory::Materials, "sq ft", dec!(5), dec!(8));
        tile.quantity = Some(dec!(10));
        let tile = RateEntry::new("owner", tile);
        let mut install = NewRate::new("Install", RateCategory::Labor, "hour", dec!(40), dec!(70));
        install.hours = Some(dec!(3));
        let install = RateEntry::new("owner", install);
        let mut disposal = NewRate::new("Disposal", RateCategory::Overhead, "each", dec!(25), dec!(35));
        disposal.quantity = Some(dec!(2));
        let disposal = RateEntry::new("owner", disposal);
        let rates = vec![tile.clone(), install.clone(), disposal.clone()];

        let mut materials: ItemList<MaterialItem> = ItemList::new();
        materials.add_from_rate(&rates, tile.id);
        let seeded = materials.get(0).unwrap();
        assert_eq!(seeded.actual_cost, seeded.quantity * seeded.cost_per_unit);
        assert_eq!(seeded.actual_cost, dec!(50));

        let mut labor: ItemList<LaborItem> = ItemList::new();
        labor.add_from_rate(&rates, install.id);
        assert_eq!(labor.get(0).unwrap().actual_cost, dec!(120));

        let mut overhead: ItemList<OverheadItem> = ItemList::new();
        overhead.add_from_rate(&rates, disposal.id);
        assert_eq!(overhead.get(0).unwrap().actual_cost, dec!(50));
        assert_eq!(materials.total() + labor.total() + overhead.total(), dec!(220));
    }

    #[test]
    fn test_blank_items_have_default_units() {
        let mut list: ItemList<OverheadItem> = ItemList::new();
        let idx = list.add();
        assert_eq!(list.get(idx).unwrap().unit, "each");
        assert_eq!(MaterialItem::default().unit, "sq ft");
    }

    #[test]
    fn test_serializes_as_plain_array() {
        let mut list: ItemList<LaborItem> = ItemList::new();
        list.add();
        let json = serde_json::to_value(&list).unwrap();
        assert!(json.is_array());
    }
}
