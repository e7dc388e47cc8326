//! Return on the subscription.

use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::mean;
use crate::bids::{Bid, BidStatus};
use crate::pricing::numeric::checked_sum;

/// Assumed margin before the product was used. The margin gain over this
/// baseline is what the ROI credits.
pub const BASELINE_MARGIN: Decimal = dec!(15);

const MONTH_MILLIS: i64 = 30 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiInputs {
    pub monthly_subscription: Decimal,
    pub time_saved_hours: Decimal,
    pub hourly_rate: Decimal,
    pub start_date: NaiveDate,
}

impl RoiInputs {
    /// Default inputs, measuring from three months before `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            monthly_subscription: dec!(29),
            time_saved_hours: dec!(10),
            hourly_rate: dec!(50),
            start_date: today.checked_sub_months(Months::new(3)).unwrap_or(today),
        }
    }

    pub fn with_start_date(mut self, start_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoiReport {
    pub months_since_start: u32,
    pub total_bids: usize,
    pub accepted_bids: usize,
    pub total_revenue: Decimal,
    pub total_profit: Decimal,
    pub avg_profit_margin: Decimal,
    pub additional_profit_from_margins: Decimal,
    pub time_savings_value: Decimal,
    pub total_app_cost: Decimal,
    pub total_benefit: Decimal,
    /// Percentage; zero when the subscription is free.
    pub roi: Decimal,
    pub net_gain: Decimal,
}

/// Whole 30-day months since the start, rounded up, at least one.
fn months_since(start: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let millis = (now - start).num_milliseconds();
    let months = if millis <= 0 {
        0
    } else {
        (millis + MONTH_MILLIS - 1) / MONTH_MILLIS
    };
    u32::try_from(months).unwrap_or(u32::MAX).max(1)
}

pub fn calculate_roi(bids: &[Bid], inputs: &RoiInputs, now: DateTime<Utc>) -> RoiReport {
    let start = inputs.start_date.and_time(chrono::NaiveTime::MIN).and_utc();
    let months = months_since(start, now);
    let months_dec = Decimal::from(months);

    let since_start: Vec<&Bid> = bids.iter().filter(|b| b.created_at > start).collect();
    let won: Vec<&&Bid> = since_start
        .iter()
        .filter(|b| b.status() == BidStatus::Accepted)
        .collect();

    let total_revenue = checked_sum(won.iter().map(|b| b.totals.total_bid_amount));
    let total_profit = checked_sum(won.iter().map(|b| b.totals.total_profit));
    let avg_profit_margin = mean(won.iter().map(|b| b.totals.profit_margin_percentage));

    let margin_gain = (avg_profit_margin - BASELINE_MARGIN).max(Decimal::ZERO);
    let additional_profit_from_margins = total_revenue * margin_gain / Decimal::ONE_HUNDRED;
    let time_savings_value = inputs.time_saved_hours * inputs.hourly_rate * months_dec;
    let total_app_cost = inputs.monthly_subscription * months_dec;
    let total_benefit = additional_profit_from_margins + time_savings_value;
    let roi = if total_app_cost > Decimal::ZERO {
        (total_benefit - total_app_cost) / total_app_cost * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    RoiReport {
        months_since_start: months,
        total_bids: since_start.len(),
        accepted_bids: won.len(),
        total_revenue,
        total_profit,
        avg_profit_margin,
        additional_profit_from_margins,
        time_savings_value,
        total_app_cost,
        total_benefit,
        roi,
        net_gain: total_benefit - total_app_cost,
    }
}
