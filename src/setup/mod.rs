//! AI business setup.
//!
//! Turns a free-text description of a business into a starter rate catalog.
//! Generated rates are stored one at a time so a single bad rate does not
//! sink the rest.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::db::Database;
use crate::error::ValidationError;
use crate::llm::{GenerationService, generate_or_fallback};
use crate::pricing::{NewRate, RateCategory, RateEntry};
use crate::retry::RetryPolicy;

/// A rate as the generator returns it. The category is free text until checked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratedRate {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub cost_per_unit: Decimal,
    pub charge_per_unit: Decimal,
    pub description: Option<String>,
}

impl GeneratedRate {
    /// `None` for an unknown category or a blank name.
    pub fn to_new_rate(&self) -> Option<NewRate> {
        let category = RateCategory::parse(self.category.trim())?;
        if self.name.trim().is_empty() {
            return None;
        }
        let mut rate = NewRate::new(
            self.name.trim(),
            category,
            self.unit.trim(),
            self.cost_per_unit,
            self.charge_per_unit,
        );
        if let Some(description) = self.description.as_deref().filter(|d| !d.trim().is_empty()) {
            rate = rate.with_description(description);
        }
        Some(rate)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessSetup {
    pub business_type: String,
    pub service_rates: Vec<GeneratedRate>,
    pub setup_summary: String,
}

#[derive(Debug, Clone, Default)]
pub struct SetupReport {
    pub business_type: String,
    pub summary: String,
    pub created: Vec<RateEntry>,
    /// Names of rates with an unknown category or no name.
    pub skipped: Vec<String>,
    /// Names of rates the store refused.
    pub failed: Vec<String>,
    pub used_fallback: bool,
}

pub fn setup_prompt(description: &str) -> String {
    format!(
        "A business owner described their operation: \"{description}\"\n\n\
         Based on this description, create a business setup with SERVICE RATES: detailed \
         service rates with realistic costs and pricing for this industry. Use \"sq ft\" as the \
         default unit for most materials and services unless the business specifically requires \
         other units like \"hour\" for labor or \"each\" for individual items.\n\n\
         IMPORTANT: ALWAYS include a general \"Labor\" service rate with unit \"hour\" for basic \
         worker hourly costs. This is in addition to any specialized labor services for the \
         specific industry. Use realistic hourly costs (what you pay workers) and hourly charges \
         (what you charge customers).\n\n\
         Make all numbers realistic for the industry described. If they mentioned specific \
         costs, use those as a baseline. Finish with a short setup summary."
    )
}

pub fn setup_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "business_type": { "type": "string" },
            "service_rates": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "category": {
                            "type": "string",
                            "enum": ["materials", "labor", "equipment", "overhead"]
                        },
                        "unit": { "type": "string" },
                        "cost_per_unit": { "type": "number" },
                        "charge_per_unit": { "type": "number" },
                        "description": { "type": "string" }
                    }
                }
            },
            "setup_summary": { "type": "string" }
        }
    })
}

/// Minimal setup used when generation is unavailable: one general labor rate.
pub fn fallback_setup() -> BusinessSetup {
    BusinessSetup {
        business_type: String::new(),
        service_rates: vec![GeneratedRate {
            name: "Labor".to_string(),
            category: RateCategory::Labor.as_str().to_string(),
            unit: "hour".to_string(),
            cost_per_unit: dec!(25),
            charge_per_unit: dec!(50),
            description: Some("General worker hourly rate".to_string()),
        }],
        setup_summary: "A general labor rate was added. Review it and add the rates your \
            business uses on the Service Rates page."
            .to_string(),
    }
}

/// Store generated rates one by one, recording what was skipped or refused.
pub async fn import_rates(
    db: &dyn Database,
    owner: &str,
    rates: &[GeneratedRate],
) -> (Vec<RateEntry>, Vec<String>, Vec<String>) {
    let mut created = Vec::new();
    let mut skipped = Vec::new();
    let mut failed = Vec::new();

    for generated in rates {
        let Some(rate) = generated.to_new_rate() else {
            tracing::debug!(
                "Skipping generated rate {:?} with category {:?}",
                generated.name,
                generated.category
            );
            skipped.push(generated.name.clone());
            continue;
        };
        match db.create_rate(owner, &rate).await {
            Ok(entry) => created.push(entry),
            Err(e) => {
                tracing::warn!("Failed to create rate {}: {}", rate.name, e);
                failed.push(rate.name);
            }
        }
    }

    tracing::info!(
        "Created {} service rates for {} ({} skipped, {} failed)",
        created.len(),
        owner,
        skipped.len(),
        failed.len()
    );
    (created, skipped, failed)
}

pub struct SetupService {
    db: Arc<dyn Database>,
    generator: Arc<dyn GenerationService>,
    policy: RetryPolicy,
}

impl SetupService {
    pub fn new(
        db: Arc<dyn Database>,
        generator: Arc<dyn GenerationService>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            db,
            generator,
            policy,
        }
    }

    /// Build a starter rate catalog from a description of the business.
    pub async fn run(&self, owner: &str, description: &str) -> Result<SetupReport, ValidationError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ValidationError::MissingField("business_description"));
        }

        let generated = generate_or_fallback(
            self.generator.as_ref(),
            &self.policy,
            "Business setup",
            &setup_prompt(description),
            &setup_schema(),
            fallback_setup,
        )
        .await;

        let setup = generated.value;
        let (created, skipped, failed) =
            import_rates(self.db.as_ref(), owner, &setup.service_rates).await;

        Ok(SetupReport {
            business_type: setup.business_type,
            summary: setup.setup_summary,
            created,
            skipped,
            failed,
            used_fallback: generated.used_fallback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDatabase;
    use crate::llm::ScriptedGenerator;
    use std::time::Duration;

    fn service(db: &Arc<MemoryDatabase>, generator: &Arc<ScriptedGenerator>) -> SetupService {
        SetupService::new(
            db.clone(),
            generator.clone(),
            RetryPolicy::linear(3, Duration::from_secs(1)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_imports_known_categories() {
        let db = Arc::new(MemoryDatabase::new());
        let generator = Arc::new(ScriptedGenerator::new());
        generator.push_json(json!({
            "business_type": "Painting",
            "service_rates": [
                {"name": "Labor", "category": "labor", "unit": "hour",
                 "cost_per_unit": 25, "charge_per_unit": 50},
                {"name": "Paint", "category": "materials", "unit": "gallon",
                 "cost_per_unit": 30, "charge_per_unit": 40, "description": "Interior latex"},
                {"name": "Permits", "category": "fees", "unit": "each",
                 "cost_per_unit": 100, "charge_per_unit": 100}
            ],
            "setup_summary": "Ready to paint."
        }));

        let report = service(&db, &generator)
            .run("me", "I run a small painting company")
            .await
            .unwrap();

        assert!(!report.used_fallback);
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.skipped, vec!["Permits".to_string()]);
        assert_eq!(report.summary, "Ready to paint.");

        let rates = db.list_rates("me").await.unwrap();
        let paint = rates.iter().find(|r| r.name() == "Paint").unwrap();
        assert_eq!(paint.profit_margin, dec!(25));
        assert_eq!(paint.rate.description.as_deref(), Some("Interior latex"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_failures_are_counted() {
        let db = Arc::new(MemoryDatabase::new());
        let rates = vec![
            GeneratedRate {
                name: "A".into(),
                category: "labor".into(),
                ..Default::default()
            },
            GeneratedRate {
                name: "B".into(),
                category: "overhead".into(),
                ..Default::default()
            },
        ];
        db.fail_next(1);

        let (created, skipped, failed) = import_rates(db.as_ref(), "me", &rates).await;
        assert_eq!(created.len(), 1);
        assert!(skipped.is_empty());
        assert_eq!(failed, vec!["A".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_to_labor_rate() {
        let db = Arc::new(MemoryDatabase::new());
        let generator = Arc::new(ScriptedGenerator::new());

        let report = service(&db, &generator).run("me", "Landscaping").await.unwrap();
        assert!(report.used_fallback);
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].category(), RateCategory::Labor);
    }

    #[tokio::test]
    async fn test_blank_description_rejected() {
        let db = Arc::new(MemoryDatabase::new());
        let generator = Arc::new(ScriptedGenerator::new());
        let result = service(&db, &generator).run("me", "   ").await;
        assert!(matches!(result, Err(ValidationError::MissingField(_))));
        assert_eq!(generator.calls(), 0);
    }
}
