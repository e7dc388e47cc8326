//! Proposal document rendering.

use std::fmt::Write;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::content::ProposalSections;
use crate::bids::Bid;
use crate::profile::CompanyProfile;

const SECTION_STYLE: &str = "margin-bottom: 30px;";
const HEADING_STYLE: &str =
    "font-size: 22px; font-weight: bold; margin: 0 0 15px 0; border-bottom: 1px solid #444444; padding-bottom: 5px;";

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape, then turn newlines into `<br>`.
fn multiline(text: &str) -> String {
    escape_html(text).replace('\n', "<br>")
}

fn money(amount: Decimal) -> String {
    format!("${:.2}", amount)
}

/// Cost lines shown in the investment breakdown, skipping zero categories.
pub fn investment_lines(bid: &Bid) -> Vec<(&'static str, Decimal)> {
    let t = &bid.totals;
    [
        ("Materials & Supplies", t.materials_total),
        ("Labor & Services", t.labor_total),
        ("Equipment Rental", t.equipment_total),
        ("Overhead & Admin", t.overhead_total),
        ("Project Management", t.markup_amount),
    ]
    .into_iter()
    .filter(|(_, amount)| *amount > Decimal::ZERO)
    .collect()
}

fn section(html: &mut String, title: &str, body: &str) {
    let _ = write!(
        html,
        r#"<div style="{SECTION_STYLE}"><h3 style="{HEADING_STYLE}">{}</h3><p style="line-height: 1.8; margin: 0;">{}</p></div>"#,
        escape_html(title),
        multiline(body)
    );
}

/// Render the client-facing proposal document.
pub fn render_proposal_html(
    bid: &Bid,
    sections: &ProposalSections,
    company: &CompanyProfile,
    date: NaiveDate,
) -> String {
    let sections = sections.with_placeholders();
    let draft = &bid.draft;
    let mut html = String::new();

    html.push_str(
        r#"<div style="line-height: 1.6; font-family: Arial, sans-serif; padding: 20px;">"#,
    );

    // Header
    html.push_str(
        r#"<div style="text-align: center; margin-bottom: 30px; border-bottom: 2px solid #444444; padding-bottom: 20px;">"#,
    );
    if !company.logo_url.is_empty() {
        let _ = write!(
            html,
            r#"<img src="{}" alt="Company Logo" style="width: 150px; height: auto; margin: 0 auto 20px; display: block;" />"#,
            escape_html(&company.logo_url)
        );
    }
    let title = if draft.project_title.is_empty() {
        "Project Title"
    } else {
        draft.project_title.as_str()
    };
    let _ = write!(
        html,
        r#"<h1 style="font-size: 36px; font-weight: bold; margin: 0 0 10px 0;">PROJECT PROPOSAL</h1><p style="font-size: 20px; margin: 0;">{}</p>"#,
        escape_html(title)
    );
    html.push_str(r#"<div style="margin-top: 20px; font-size: 14px;">"#);
    if !company.company_name.is_empty() {
        let _ = write!(
            html,
            r#"<p style="font-weight: bold; margin: 5px 0;">{}</p>"#,
            escape_html(&company.company_name)
        );
    }
    if !company.address.is_empty() {
        let _ = write!(
            html,
            r#"<p style="margin: 5px 0;">{}</p>"#,
            escape_html(&company.address)
        );
    }
    let contact: Vec<&str> = [company.phone.as_str(), company.email.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    if !contact.is_empty() {
        let _ = write!(
            html,
            r#"<p style="margin: 5px 0;">{}</p>"#,
            escape_html(&contact.join(" | "))
        );
    }
    if !company.website.is_empty() {
        let _ = write!(
            html,
            r#"<p style="margin: 5px 0;">{}</p>"#,
            escape_html(&company.website)
        );
    }
    let _ = write!(
        html,
        r#"<p style="margin-top: 15px; font-weight: bold;">Proposal Date: {}</p></div></div>"#,
        date.format("%-m/%-d/%Y")
    );

    section(&mut html, "Executive Summary", &sections.executive_summary);

    let _ = write!(
        html,
        r#"<div style="{SECTION_STYLE}"><h3 style="{HEADING_STYLE}">Project Details</h3><div style="padding: 20px; border: 1px solid #444444;"><p><strong>Project:</strong> {}</p><p><strong>Client:</strong> {}</p><p><strong>Description:</strong></p><p style="line-height: 1.8;">{}</p></div></div>"#,
        escape_html(&draft.project_title),
        escape_html(&draft.client_name),
        multiline(&draft.project_description)
    );

    section(&mut html, "Scope of Work", &sections.scope_of_work);

    let _ = write!(
        html,
        r#"<div style="{SECTION_STYLE}"><h3 style="{HEADING_STYLE}">Investment Breakdown</h3><div style="padding: 25px; border: 2px solid #444444;">"#
    );
    for (label, amount) in investment_lines(bid) {
        let _ = write!(
            html,
            r#"<p style="margin: 8px 0;">{}: <strong>{}</strong></p>"#,
            escape_html(label),
            money(amount)
        );
    }
    let _ = write!(
        html,
        r#"<div style="border-top: 2px solid #444444; margin-top: 15px; padding-top: 15px;"><p style="font-weight: bold; font-size: 20px; margin: 0; text-align: center;">TOTAL INVESTMENT: {}</p></div></div></div>"#,
        money(bid.totals.total_bid_amount)
    );

    section(&mut html, "Project Timeline", &sections.timeline);
    section(&mut html, "Payment Schedule", &sections.payment_schedule);
    section(&mut html, "Terms & Conditions", &sections.terms_and_conditions);

    let _ = write!(
        html,
        r#"<div style="text-align: center; border-top: 2px solid #444444; padding-top: 25px; margin-top: 30px;"><p style="line-height: 1.8; margin: 0;">{}</p></div>"#,
        multiline(&sections.closing_statement)
    );

    html.push_str("</div>");
    html
}

/// Plain-text version for pasting into an email.
pub fn render_proposal_text(
    bid: &Bid,
    sections: &ProposalSections,
    company: &CompanyProfile,
    date: NaiveDate,
) -> String {
    let sections = sections.with_placeholders();
    let draft = &bid.draft;
    let business = if company.company_name.trim().is_empty() {
        "Your Business"
    } else {
        company.company_name.as_str()
    };

    let mut out = String::new();
    let _ = writeln!(out, "Subject: Proposal for {}\n", draft.project_title);
    let _ = writeln!(
        out,
        "Hi {},\n\nI'm excited to submit my proposal for your {} project. Please review it \
         below and let me know if you have any questions.\n\nI look forward to working with \
         you!\n\nBest regards,\n{}\n",
        draft.client_name, draft.project_title, business
    );
    out.push_str("-----------------------------------\n\n");

    let _ = writeln!(out, "PROJECT PROPOSAL\n\n{}\n", draft.project_title);
    for line in [
        company.company_name.as_str(),
        company.address.as_str(),
        company.phone.as_str(),
        company.email.as_str(),
        company.website.as_str(),
    ] {
        if !line.is_empty() {
            let _ = writeln!(out, "{line}");
        }
    }
    let _ = writeln!(out, "Proposal Date: {}\n", date.format("%-m/%-d/%Y"));

    let mut block = |title: &str, body: &str| {
        let _ = writeln!(out, "{title}\n\n{}\n", body.trim());
    };
    block("Executive Summary", &sections.executive_summary);
    block(
        "Project Details",
        &format!(
            "Project: {}\nClient: {}\nDescription:\n{}",
            draft.project_title, draft.client_name, draft.project_description
        ),
    );
    block("Scope of Work", &sections.scope_of_work);

    let mut breakdown: Vec<String> = investment_lines(bid)
        .into_iter()
        .map(|(label, amount)| format!("{label}: {}", money(amount)))
        .collect();
    breakdown.push(format!(
        "TOTAL INVESTMENT: {}",
        money(bid.totals.total_bid_amount)
    ));
    block("Investment Breakdown", &breakdown.join("\n"));

    block("Project Timeline", &sections.timeline);
    block("Payment Schedule", &sections.payment_schedule);
    block("Terms & Conditions", &sections.terms_and_conditions);
    block("", &sections.closing_statement);

    out.trim().to_string()
}
