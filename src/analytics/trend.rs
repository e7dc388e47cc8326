//! Month-by-month performance since a start date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::{accepted, add_months, mean, month_label, month_start, same_month};
use crate::bids::Bid;
use crate::pricing::numeric::checked_sum;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendMonth {
    pub month: NaiveDate,
    pub label: String,
    pub revenue: Decimal,
    pub profit: Decimal,
    /// Mean margin of the month's accepted bids, one decimal place.
    pub margin: Decimal,
    pub bids: usize,
    pub accepted: usize,
}

/// One entry per calendar month from `start` through `today`, oldest first.
/// A start after today still yields the current month.
pub fn monthly_trend(bids: &[Bid], start: NaiveDate, today: NaiveDate) -> Vec<TrendMonth> {
    let last = month_start(today);
    let mut month = month_start(start);
    let mut months = Vec::new();

    while month <= last {
        let in_month: Vec<Bid> = bids
            .iter()
            .filter(|b| same_month(b.created_at.date_naive(), month))
            .cloned()
            .collect();
        let won: Vec<&Bid> = accepted(&in_month).collect();

        months.push(TrendMonth {
            month,
            label: month_label(month),
            revenue: checked_sum(won.iter().map(|b| b.totals.total_bid_amount)),
            profit: checked_sum(won.iter().map(|b| b.totals.total_profit)),
            margin: mean(won.iter().map(|b| b.totals.profit_margin_percentage)).round_dp(1),
            bids: in_month.len(),
            accepted: won.len(),
        });

        let next = add_months(month, 1);
        if next == month {
            break;
        }
        month = next;
    }

    if months.is_empty() {
        months.push(TrendMonth {
            month: last,
            label: month_label(last),
            revenue: Decimal::ZERO,
            profit: Decimal::ZERO,
            margin: Decimal::ZERO,
            bids: 0,
            accepted: 0,
        });
    }

    months
}
