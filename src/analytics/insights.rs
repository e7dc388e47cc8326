//! AI business insights over bidding performance.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::BidStats;
use crate::bids::Bid;
use crate::llm::{Generated, GenerationService, generate_or_fallback};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPriority {
    pub action: String,
    pub impact: Level,
    pub effort: Level,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessInsights {
    /// 0 to 100.
    pub overall_score: Decimal,
    pub performance_assessment: String,
    pub optimization_opportunities: Vec<String>,
    pub bidding_strategy_recommendations: Vec<String>,
    pub risk_factors: Vec<String>,
    pub action_priorities: Vec<ActionPriority>,
}

pub fn insights_prompt(stats: &BidStats) -> String {
    format!(
        "Analyze this company's job bidding performance and provide strategic insights:\n\n\
         Bidding Overview:\n\
         - Total Bids Submitted: {}\n\
         - Win Rate: {:.1}%\n\
         - Accepted Bids: {}\n\
         - Rejected Bids: {}\n\
         - Average Bid Value: ${:.2}\n\
         - Average Profit Margin on Bids: {:.1}%\n\n\
         Provide comprehensive business insights for this service company based on their \
         bidding data. Include:\n\
         1. Overall performance assessment and a score out of 100.\n\
         2. Specific opportunities to improve win rate and profitability.\n\
         3. Bidding strategy recommendations (e.g., pricing adjustments, proposal improvements).\n\
         4. Risk assessment based on bidding patterns (e.g., margins too low, bidding on wrong projects).\n\
         5. Actionable priorities, ranked by impact and effort.",
        stats.total_bids,
        stats.win_rate,
        stats.accepted_count,
        stats.rejected_count,
        stats.average_bid_value,
        stats.average_margin,
    )
}

pub fn insights_schema() -> serde_json::Value {
    let level = json!({ "type": "string", "enum": ["high", "medium", "low"] });
    let strings = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "type": "object",
        "properties": {
            "overall_score": { "type": "number", "minimum": 0, "maximum": 100 },
            "performance_assessment": { "type": "string" },
            "optimization_opportunities": strings,
            "bidding_strategy_recommendations": strings,
            "risk_factors": strings,
            "action_priorities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "action": { "type": "string" },
                        "impact": level,
                        "effort": level
                    }
                }
            }
        }
    })
}

/// Insights derived from the statistics alone.
pub fn fallback_insights(stats: &BidStats) -> BusinessInsights {
    let margin = stats.average_margin;
    let win_rate = stats.win_rate;

    let score = (win_rate / dec!(2) + margin.min(dec!(30)) * dec!(5) / dec!(3))
        .round()
        .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);

    let mut opportunities = Vec::new();
    if win_rate < dec!(30) {
        opportunities
            .push("Follow up on sent proposals within a few days to lift your win rate.".to_string());
    }
    if margin < dec!(20) {
        opportunities.push(
            "Review your markup: margins under 20% leave little room for surprises.".to_string(),
        );
    }
    if stats.pending_count > 0 {
        opportunities.push(format!(
            "You have {} bids in draft or sent status; prioritize finishing and following up on them.",
            stats.pending_count
        ));
    }
    opportunities.push("Use saved service rates to price bids faster and more consistently.".to_string());

    let mut recommendations = vec![
        "Attach a generated proposal to every bid so clients see a clear scope and payment schedule."
            .to_string(),
    ];
    if stats.rejected_count > stats.accepted_count {
        recommendations.push(
            "Ask rejected clients for feedback to learn whether price or scope lost the job."
                .to_string(),
        );
    }
    recommendations.push("Track which job types win most often and focus bidding there.".to_string());

    let mut risks = Vec::new();
    if margin < dec!(15) {
        risks.push("Average margin is below 15%, so cost overruns can erase profit.".to_string());
    }
    if win_rate > dec!(80) && stats.total_bids >= 5 {
        risks.push("A very high win rate can mean your prices are too low.".to_string());
    }
    if stats.total_bids < 5 {
        risks.push("Few bids so far; these figures will change quickly as you add more.".to_string());
    }

    let action_priorities = opportunities
        .iter()
        .enumerate()
        .map(|(i, action)| ActionPriority {
            action: action.clone(),
            impact: if i == 0 { Level::High } else { Level::Medium },
            effort: Level::Low,
        })
        .collect();

    BusinessInsights {
        overall_score: score,
        performance_assessment: format!(
            "You have submitted {} bids with a {:.1}% win rate and an average margin of {:.1}%.",
            stats.total_bids, win_rate, margin
        ),
        optimization_opportunities: opportunities,
        bidding_strategy_recommendations: recommendations,
        risk_factors: risks,
        action_priorities,
    }
}

pub struct InsightsService {
    generator: Arc<dyn GenerationService>,
    policy: RetryPolicy,
}

impl InsightsService {
    pub fn new(generator: Arc<dyn GenerationService>, policy: RetryPolicy) -> Self {
        Self { generator, policy }
    }

    /// Insights for the given bids, or `None` when there are no bids to analyze.
    pub async fn generate(&self, bids: &[Bid]) -> Option<Generated<BusinessInsights>> {
        if bids.is_empty() {
            return None;
        }
        let stats = BidStats::from_bids(bids);
        let mut generated = generate_or_fallback(
            self.generator.as_ref(),
            &self.policy,
            "Business insights",
            &insights_prompt(&stats),
            &insights_schema(),
            || fallback_insights(&stats),
        )
        .await;
        generated.value.overall_score = generated
            .value
            .overall_score
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
        Some(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::bid_on;
    use crate::bids::BidStatus;
    use crate::llm::ScriptedGenerator;
    use chrono::NaiveDate;
    use std::time::Duration;

    fn bids() -> Vec<Bid> {
        let day = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        vec![
            bid_on(day, BidStatus::Accepted, dec!(1000), dec!(25)),
            bid_on(day, BidStatus::Rejected, dec!(1000), dec!(25)),
            bid_on(day, BidStatus::Rejected, dec!(1000), dec!(25)),
            bid_on(day, BidStatus::Sent, dec!(1000), dec!(25)),
        ]
    }

    #[test]
    fn test_prompt_formats_stats() {
        let prompt = insights_prompt(&BidStats::from_bids(&bids()));
        assert!(prompt.contains("Total Bids Submitted: 4"));
        assert!(prompt.contains("Win Rate: 25.0%"));
        assert!(prompt.contains("Average Bid Value: $1250.00"));
        assert!(prompt.contains("Average Profit Margin on Bids: 20.0%"));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let stats = BidStats::from_bids(&bids());
        let insights = fallback_insights(&stats);

        // 25 / 2 + 20 * 5 / 3 = 45.83
        assert_eq!(insights.overall_score, dec!(46));
        assert_eq!(insights, fallback_insights(&stats));
        assert!(insights.optimization_opportunities[0].contains("win rate"));
        assert_eq!(insights.action_priorities[0].impact, Level::High);
        assert!(
            insights
                .bidding_strategy_recommendations
                .iter()
                .any(|r| r.contains("rejected clients"))
        );
        assert!(insights.risk_factors.iter().any(|r| r.contains("Few bids")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_uses_generated_insights() {
        let generator = Arc::new(ScriptedGenerator::new());
        generator.push_json(json!({
            "overall_score": 140,
            "performance_assessment": "Solid",
            "action_priorities": [{"action": "Raise prices", "impact": "high", "effort": "low"}]
        }));
        let service = InsightsService::new(generator, RetryPolicy::linear(3, Duration::from_secs(1)));

        let result = service.generate(&bids()).await.unwrap();
        assert!(!result.used_fallback);
        assert_eq!(result.value.overall_score, dec!(100));
        assert_eq!(result.value.performance_assessment, "Solid");
        assert_eq!(result.value.action_priorities[0].effort, Level::Low);
    }

    #[tokio::test(start_paused = true)]
    async fn test_service_falls_back_and_skips_empty() {
        let generator = Arc::new(ScriptedGenerator::new());
        let service = InsightsService::new(generator, RetryPolicy::linear(3, Duration::from_secs(1)));

        assert!(service.generate(&[]).await.is_none());
        let result = service.generate(&bids()).await.unwrap();
        assert!(result.used_fallback);
        assert_eq!(result.value.overall_score, dec!(46));
    }
}
