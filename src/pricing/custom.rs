//! User-defined custom expense categories.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::items::{CustomExpenseItem, ItemList, UnitCostField};
use super::numeric::checked_sum;
use crate::error::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomExpenseCategory {
    pub category_name: String,
    #[serde(default)]
    pub items: ItemList<CustomExpenseItem>,
}

impl CustomExpenseCategory {
    pub fn total(&self) -> Decimal {
        self.items.total()
    }
}

/// Ordered custom categories, each with its own items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomExpenses {
    categories: Vec<CustomExpenseCategory>,
}

impl CustomExpenses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an empty category. The name is trimmed and must not be blank.
    pub fn add_category(&mut self, name: &str) -> Result<usize, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyCategoryName);
        }
        self.categories.push(CustomExpenseCategory {
            category_name: name.to_string(),
            items: ItemList::new(),
        });
        Ok(self.categories.len() - 1)
    }

    pub fn remove_category(&mut self, index: usize) -> Option<CustomExpenseCategory> {
        if index < self.categories.len() {
            Some(self.categories.remove(index))
        } else {
            None
        }
    }

    /// Append a blank item to a category. Returns the item index.
    pub fn add_item(&mut self, category: usize) -> Option<usize> {
        self.categories.get_mut(category).map(|c| c.items.add())
    }

    pub fn update_item(&mut self, category: usize, item: usize, field: UnitCostField) -> bool {
        self.categories
            .get_mut(category)
            .is_some_and(|c| c.items.update(item, field))
    }

    pub fn remove_item(&mut self, category: usize, item: usize) -> Option<CustomExpenseItem> {
        self.categories
            .get_mut(category)
            .and_then(|c| c.items.remove(item))
    }

    pub fn duplicate_item(&mut self, category: usize, item: usize) -> bool {
        self.categories
            .get_mut(category)
            .is_some_and(|c| c.items.duplicate(item))
    }

    /// Sum over every item of every category.
    pub fn total(&self) -> Decimal {
        checked_sum(self.categories.iter().map(CustomExpenseCategory::total))
    }

    pub fn get(&self, index: usize) -> Option<&CustomExpenseCategory> {
        self.categories.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CustomExpenseCategory> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_blank_category_rejected() {
        let mut custom = CustomExpenses::new();
        assert_eq!(custom.add_category("   "), Err(ValidationError::EmptyCategoryName));
        assert!(custom.is_empty());

        assert_eq!(custom.add_category("  Permits "), Ok(0));
        assert_eq!(custom.get(0).unwrap().category_name, "Permits");
    }

    #[test]
    fn test_nested_items_total() {
        let mut custom = CustomExpenses::new();
        let permits = custom.add_category("Permits").unwrap();
        let disposal = custom.add_category("Disposal").unwrap();

        let item = custom.add_item(permits).unwrap();
        custom.update_item(permits, item, UnitCostField::Quantity("2".into()));
        custom.update_item(permits, item, UnitCostField::CostPerUnit("75".into()));

        let item = custom.add_item(disposal).unwrap();
        custom.update_item(disposal, item, UnitCostField::Quantity("1".into()));
        custom.update_item(disposal, item, UnitCostField::CostPerUnit("150".into()));
        assert!(custom.duplicate_item(disposal, item));

        assert_eq!(custom.total(), dec!(450));

        custom.remove_item(disposal, 0);
        assert_eq!(custom.total(), dec!(300));

        custom.remove_category(permits);
        assert_eq!(custom.total(), dec!(150));
        assert_eq!(custom.add_item(9), None);
        assert!(!custom.update_item(9, 0, UnitCostField::Unit("x".into())));
    }
}
