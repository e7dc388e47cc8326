//! Proposal prose: the generation prompt, its schema, and the fallback template.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::bids::Bid;
use crate::profile::CompanyProfile;

/// The six prose sections of a proposal. Missing sections deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalSections {
    pub executive_summary: String,
    pub scope_of_work: String,
    pub timeline: String,
    pub terms_and_conditions: String,
    pub payment_schedule: String,
    pub closing_statement: String,
}

/// A single editable section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionEdit {
    ExecutiveSummary(String),
    ScopeOfWork(String),
    Timeline(String),
    TermsAndConditions(String),
    PaymentSchedule(String),
    ClosingStatement(String),
}

impl ProposalSections {
    pub fn apply(&mut self, edit: SectionEdit) {
        match edit {
            SectionEdit::ExecutiveSummary(v) => self.executive_summary = v,
            SectionEdit::ScopeOfWork(v) => self.scope_of_work = v,
            SectionEdit::Timeline(v) => self.timeline = v,
            SectionEdit::TermsAndConditions(v) => self.terms_and_conditions = v,
            SectionEdit::PaymentSchedule(v) => self.payment_schedule = v,
            SectionEdit::ClosingStatement(v) => self.closing_statement = v,
        }
    }

    /// Blank sections replaced with fixed placeholder sentences.
    pub fn with_placeholders(&self) -> Self {
        fn or(value: &str, placeholder: &str) -> String {
            if value.trim().is_empty() {
                placeholder.to_string()
            } else {
                value.to_string()
            }
        }
        Self {
            executive_summary: or(&self.executive_summary, "Executive summary will be provided."),
            scope_of_work: or(&self.scope_of_work, "Scope of work details will be provided."),
            timeline: or(&self.timeline, "Project timeline will be provided."),
            terms_and_conditions: or(
                &self.terms_and_conditions,
                "Terms and conditions will be provided.",
            ),
            payment_schedule: or(&self.payment_schedule, "Payment schedule will be provided."),
            closing_statement: or(
                &self.closing_statement,
                "Thank you for considering our proposal.",
            ),
        }
    }
}

pub fn proposal_prompt(bid: &Bid, company: &CompanyProfile) -> String {
    format!(
        "Create a professional, client-ready proposal based on this job bid:\n\n\
         Project: {}\n\
         Client: {}\n\
         Description: {}\n\
         Total Amount: ${:.2}\n\n\
         Company Info: {}\n\n\
         Generate a comprehensive proposal that includes: an executive summary, a detailed \
         scope of work, timeline estimates, terms and conditions, a payment schedule, and a \
         professional closing statement. Structure it with clear headings.",
        bid.draft.project_title,
        bid.draft.client_name,
        bid.draft.project_description,
        bid.totals.total_bid_amount,
        company.company_name,
    )
}

pub fn proposal_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "executive_summary": { "type": "string" },
            "scope_of_work": { "type": "string" },
            "timeline": { "type": "string" },
            "terms_and_conditions": { "type": "string" },
            "payment_schedule": { "type": "string" },
            "closing_statement": { "type": "string" }
        },
        "required": [
            "executive_summary",
            "scope_of_work",
            "timeline",
            "terms_and_conditions",
            "payment_schedule",
            "closing_statement"
        ]
    })
}

/// Deterministic proposal prose built from the bid's own fields.
pub fn fallback_sections(bid: &Bid, company: &CompanyProfile) -> ProposalSections {
    let title = &bid.draft.project_title;
    let company_name = if company.company_name.trim().is_empty() {
        "our company"
    } else {
        company.company_name.as_str()
    };

    ProposalSections {
        executive_summary: format!(
            "Thank you for considering {company_name} for your {title} project. We are excited \
             to present this comprehensive proposal outlining our approach, timeline, and \
             investment for your project."
        ),
        scope_of_work: format!(
            "Project: {title}\n\nDescription: {}\n\nWe will provide all necessary materials, \
             labor, and expertise to complete this project to your satisfaction. Our \
             experienced team will ensure quality workmanship throughout the entire process.",
            bid.draft.project_description
        ),
        timeline: format!(
            "The {title} project is estimated to be completed within 3-5 business days, \
             depending on weather conditions and project complexity. We will coordinate with \
             you to schedule work at your convenience."
        ),
        terms_and_conditions: [
            "• All work will be completed according to local building codes and regulations",
            "• We carry full liability insurance and workers compensation",
            "• Any changes to the original scope will be discussed and approved before implementation",
            "• Final payment is due upon project completion and your satisfaction",
        ]
        .join("\n"),
        payment_schedule: format!(
            "Total Investment: ${:.2}\n\n• 25% deposit due upon contract signing\n\
             • 75% balance due upon project completion\n\n\
             We accept cash, check, or major credit cards for your convenience.",
            bid.totals.total_bid_amount
        ),
        closing_statement: "We appreciate the opportunity to work with you on this project. \
            Our commitment to quality workmanship and customer satisfaction ensures you'll be \
            pleased with the results. Please don't hesitate to contact us with any questions or \
            concerns."
            .to_string(),
    }
}
