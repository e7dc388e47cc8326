//! Monthly revenue and profit forecast.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::{accepted, add_months, mean, month_label, month_start, same_month};
use crate::bids::{Bid, BidStatus};
use crate::pricing::numeric::checked_sum;

/// Months of history the accepted-bid average is spread over.
const HISTORY_MONTHS: Decimal = dec!(6);
const DEFAULT_BID_VALUE: Decimal = dec!(5000);
const DEFAULT_MARGIN: Decimal = dec!(20);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForecastHorizon {
    ThreeMonths,
    #[default]
    SixMonths,
    TwelveMonths,
}

impl ForecastHorizon {
    pub fn months(&self) -> u32 {
        match self {
            Self::ThreeMonths => 3,
            Self::SixMonths => 6,
            Self::TwelveMonths => 12,
        }
    }
}

/// One forecast month. Confirmed figures come from bids already created in
/// that month; projected figures are synthesized and kept separate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastMonth {
    pub month: NaiveDate,
    pub label: String,
    pub confirmed_revenue: Decimal,
    pub projected_revenue: Decimal,
    pub total_revenue: Decimal,
    pub confirmed_profit: Decimal,
    pub projected_profit: Decimal,
    pub total_profit: Decimal,
    pub confirmed_bids: usize,
    pub projected_bids: Decimal,
}

impl ForecastMonth {
    pub fn bid_count(&self) -> Decimal {
        Decimal::from(self.confirmed_bids as u64) + self.projected_bids
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Forecast {
    pub months: Vec<ForecastMonth>,
    pub total_revenue: Decimal,
    pub total_profit: Decimal,
    pub total_bids: Decimal,
}

/// Forecast starting with the month containing `today`.
///
/// The projection uses the average accepted bid. With no accepted bids it
/// assumes a 5000 bid at a 20% margin. A bid without a margin counts as 20%.
pub fn forecast(bids: &[Bid], today: NaiveDate, horizon: ForecastHorizon) -> Forecast {
    let won: Vec<&Bid> = accepted(bids).collect();
    let (avg_monthly_bids, avg_value, avg_margin) = if won.is_empty() {
        (Decimal::ONE, DEFAULT_BID_VALUE, DEFAULT_MARGIN)
    } else {
        (
            Decimal::from(won.len() as u64) / HISTORY_MONTHS,
            mean(won.iter().map(|b| b.totals.total_bid_amount)),
            mean(won.iter().map(|b| {
                let margin = b.totals.profit_margin_percentage;
                if margin.is_zero() { DEFAULT_MARGIN } else { margin }
            })),
        )
    };

    let first = month_start(today);
    let months: Vec<ForecastMonth> = (0..horizon.months())
        .map(|i| {
            let month = add_months(first, i);
            let in_month: Vec<&Bid> = bids
                .iter()
                .filter(|b| same_month(b.created_at.date_naive(), month))
                .collect();
            let confirmed: Vec<&&Bid> = in_month
                .iter()
                .filter(|b| b.status() == BidStatus::Accepted)
                .collect();

            let confirmed_revenue =
                checked_sum(confirmed.iter().map(|b| b.totals.total_bid_amount));
            let confirmed_profit = checked_sum(confirmed.iter().map(|b| b.totals.total_profit));

            let projected_bids =
                (avg_monthly_bids - Decimal::from(in_month.len() as u64)).max(Decimal::ONE);
            let projected_revenue = projected_bids * avg_value;
            let projected_profit = projected_revenue * avg_margin / Decimal::ONE_HUNDRED;

            ForecastMonth {
                month,
                label: month_label(month),
                confirmed_revenue,
                projected_revenue,
                total_revenue: checked_sum([confirmed_revenue, projected_revenue]),
                confirmed_profit,
                projected_profit,
                total_profit: checked_sum([confirmed_profit, projected_profit]),
                confirmed_bids: in_month.len(),
                projected_bids,
            }
        })
        .collect();

    Forecast {
        total_revenue: checked_sum(months.iter().map(|m| m.total_revenue)),
        total_profit: checked_sum(months.iter().map(|m| m.total_profit)),
        total_bids: months.iter().map(ForecastMonth::bid_count).sum(),
        months,
    }
}
