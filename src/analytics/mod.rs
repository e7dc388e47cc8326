//! Read-only business analytics over stored bids.
//!
//! Everything here is derived from bid totals and status; nothing is written
//! back. AI insights are the one exception to "pure": they call the
//! generation service, with a deterministic fallback.

mod forecast;
mod insights;
mod roi;
mod trend;

pub use forecast::{Forecast, ForecastHorizon, ForecastMonth, forecast};
pub use insights::{
    ActionPriority, BusinessInsights, InsightsService, Level, fallback_insights, insights_prompt,
    insights_schema,
};
pub use roi::{BASELINE_MARGIN, RoiInputs, RoiReport, calculate_roi};
pub use trend::{TrendMonth, monthly_trend};

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::bids::{Bid, BidStatus};
use crate::pricing::numeric::checked_sum;

/// Headline statistics for a set of bids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BidStats {
    pub total_bids: usize,
    pub accepted_count: usize,
    pub rejected_count: usize,
    /// Drafts and sent bids.
    pub pending_count: usize,
    pub accepted_value: Decimal,
    /// Mean bid price over all bids.
    pub average_bid_value: Decimal,
    /// Mean margin over all bids.
    pub average_margin: Decimal,
    /// Mean margin over accepted bids only.
    pub average_accepted_margin: Decimal,
    /// Accepted bids as a percentage of all bids.
    pub win_rate: Decimal,
}

impl BidStats {
    pub fn from_bids(bids: &[Bid]) -> Self {
        let accepted: Vec<&Bid> = accepted(bids).collect();
        let rejected_count = bids
            .iter()
            .filter(|b| b.status() == BidStatus::Rejected)
            .count();
        let pending_count = bids
            .iter()
            .filter(|b| matches!(b.status(), BidStatus::Draft | BidStatus::Sent))
            .count();

        Self {
            total_bids: bids.len(),
            accepted_count: accepted.len(),
            rejected_count,
            pending_count,
            accepted_value: checked_sum(accepted.iter().map(|b| b.totals.total_bid_amount)),
            average_bid_value: mean(bids.iter().map(|b| b.totals.total_bid_amount)),
            average_margin: mean(bids.iter().map(|b| b.totals.profit_margin_percentage)),
            average_accepted_margin: mean(
                accepted.iter().map(|b| b.totals.profit_margin_percentage),
            ),
            win_rate: percentage(accepted.len(), bids.len()),
        }
    }
}

pub(crate) fn accepted(bids: &[Bid]) -> impl Iterator<Item = &Bid> {
    bids.iter().filter(|b| b.status() == BidStatus::Accepted)
}

/// Arithmetic mean; zero for no values.
pub(crate) fn mean(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    let values: Vec<Decimal> = values.into_iter().collect();
    if values.is_empty() {
        return Decimal::ZERO;
    }
    let count = Decimal::from(values.len() as u64);
    checked_sum(values) / count
}

pub(crate) fn percentage(part: usize, whole: usize) -> Decimal {
    if whole == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(part as u64) * Decimal::ONE_HUNDRED / Decimal::from(whole as u64)
    }
}

pub(crate) fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

pub(crate) fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

/// "Jan 2025"
pub(crate) fn month_label(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

pub(crate) fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}


#[cfg(test)]
mod tests {
    use super::test_support::bid_on;
    use super::*;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn test_stats_win_rate_and_margins() {
        let bids = vec![
            bid_on(day(), BidStatus::Accepted, dec!(1000), dec!(25)),
            bid_on(day(), BidStatus::Rejected, dec!(1000), dec!(0)),
            bid_on(day(), BidStatus::Sent, dec!(1000), dec!(25)),
            bid_on(day(), BidStatus::Draft, dec!(0), dec!(20)),
        ];
        let stats = BidStats::from_bids(&bids);

        assert_eq!(stats.total_bids, 4);
        assert_eq!(stats.accepted_count, 1);
        assert_eq!(stats.rejected_count, 1);
        assert_eq!(stats.pending_count, 2);
        assert_eq!(stats.win_rate, dec!(25));
        assert_eq!(stats.accepted_value, dec!(1250));
        // 1250 * 25 / 125 = 20% margin on the accepted bid.
        assert_eq!(stats.average_accepted_margin, dec!(20));
    }

    #[test]
    fn test_empty_stats_are_zero() {
        let stats = BidStats::from_bids(&[]);
        assert_eq!(stats, BidStats::default());
    }

    #[test]
    fn test_month_helpers() {
        let jan31 = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        assert_eq!(month_start(jan31), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(add_months(jan31, 1), NaiveDate::from_ymd_opt(2025, 2, 28).unwrap());
        assert_eq!(month_label(jan31), "Jan 2025");
    }
}
