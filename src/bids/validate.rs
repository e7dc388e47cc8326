//! Checks run before an explicit save.
//!
//! [`validate_required`] is what Save & Finish enforces. [`validate_strict`]
//! additionally refuses negative amounts, for callers that want it.

use rust_decimal::Decimal;

use super::model::BidDraft;
use crate::error::ValidationError;

/// Required client and project fields, plus a plausible email.
pub fn validate_required(draft: &BidDraft) -> Result<(), ValidationError> {
    let required = [
        ("client_name", &draft.client_name),
        ("client_email", &draft.client_email),
        ("project_title", &draft.project_title),
        ("project_description", &draft.project_description),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField(field));
        }
    }
    if !is_plausible_email(&draft.client_email) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Required fields plus non-negative factors and markup.
pub fn validate_strict(draft: &BidDraft) -> Result<(), ValidationError> {
    validate_required(draft)?;

    non_negative("markup_percentage", draft.markup_percentage)?;
    let costs = &draft.costs;
    for (i, item) in costs.materials.iter().enumerate() {
        non_negative(format!("materials[{i}].quantity"), item.quantity)?;
        non_negative(format!("materials[{i}].cost_per_unit"), item.cost_per_unit)?;
    }
    for (i, item) in costs.labor_items.iter().enumerate() {
        non_negative(format!("labor_items[{i}].hours"), item.hours)?;
        non_negative(format!("labor_items[{i}].cost_per_hour"), item.cost_per_hour)?;
    }
    for (i, item) in costs.equipment_items.iter().enumerate() {
        non_negative(format!("equipment_items[{i}].rental_duration"), item.rental_duration)?;
        non_negative(format!("equipment_items[{i}].cost_per_unit"), item.cost_per_unit)?;
    }
    for (i, item) in costs.overhead_items.iter().enumerate() {
        non_negative(format!("overhead_items[{i}].quantity"), item.quantity)?;
        non_negative(format!("overhead_items[{i}].cost_per_unit"), item.cost_per_unit)?;
    }
    for (c, category) in costs.custom_expenses.iter().enumerate() {
        for (i, item) in category.items.iter().enumerate() {
            non_negative(format!("custom_expenses[{c}].items[{i}].quantity"), item.quantity)?;
            non_negative(
                format!("custom_expenses[{c}].items[{i}].cost_per_unit"),
                item.cost_per_unit,
            )?;
        }
    }
    Ok(())
}

/// Loose check: something before and after a single `@`, and a dot in the domain.
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn non_negative(field: impl Into<String>, value: Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::NegativeAmount {
            field: field.into(),
        });
    }
    Ok(())
}
