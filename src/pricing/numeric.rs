//! Numeric input handling.
//!
//! Data entry never fails on a bad number: [`coerce`] reads the longest
//! numeric prefix of the input and falls back to zero. [`parse_strict`] is
//! the opt-in layer used when a submission should reject malformed input.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Leniently parse user-entered text into a decimal.
///
/// `"12.5"` → 12.5, `"12abc"` → 12, `" .5"` → 0.5, `""`/`"abc"`/overflow → 0.
pub fn coerce(input: &str) -> Decimal {
    numeric_prefix(input.trim())
        .and_then(|prefix| Decimal::from_str(&prefix).ok())
        .unwrap_or(Decimal::ZERO)
}

/// Parse the whole input as a decimal, rejecting anything else.
pub fn parse_strict(field: &'static str, input: &str) -> Result<Decimal, ValidationError> {
    let trimmed = input.trim();
    Decimal::from_str(trimmed).map_err(|_| ValidationError::InvalidNumber {
        field,
        value: input.to_string(),
    })
}

/// Multiply two factors; an overflowing product degrades to zero.
pub fn product(a: Decimal, b: Decimal) -> Decimal {
    a.checked_mul(b).unwrap_or(Decimal::ZERO)
}

/// Add up `values`; a sum that overflows degrades to zero.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .unwrap_or(Decimal::ZERO)
}

/// `base × percent / 100`, zero on overflow.
pub fn percent_of(base: Decimal, percent: Decimal) -> Decimal {
    product(base, percent / Decimal::ONE_HUNDRED)
}

/// Extract `[sign]digits[.digits]` from the start of `s`, normalized so the
/// decimal parser accepts it (`".5"` → `"0.5"`, `"5."` → `"5"`).
fn numeric_prefix(s: &str) -> Option<String> {
    let mut chars = s.chars().peekable();
    let mut out = String::new();

    if let Some(&c) = chars.peek() {
        if c == '-' || c == '+' {
            if c == '-' {
                out.push('-');
            }
            chars.next();
        }
    }

    let mut int_part = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            int_part.push(c);
            chars.next();
        } else {
            break;
        }
    }

    let mut frac_part = String::new();
    if chars.peek() == Some(&'.') {
        chars.next();
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                frac_part.push(c);
                chars.next();
            } else {
                break;
            }
        }
    }

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }

    out.push_str(if int_part.is_empty() { "0" } else { &int_part });
    if !frac_part.is_empty() {
        out.push('.');
        out.push_str(&frac_part);
    }
    Some(out)
}
