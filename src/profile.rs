//! Owner profile and the company details stamped onto proposals and invoices.

use serde::{Deserialize, Serialize};

/// Profile fields the owner can edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub full_name: String,
    pub professional_title: String,
    pub bio: String,
    pub profile_picture_url: String,
    pub business_name: String,
    pub business_email: String,
    /// Stored as digits only.
    pub business_phone: String,
    pub business_address: String,
    pub business_website: String,
    pub business_logo_url: String,
}

impl UserProfile {
    /// Normalize before storing.
    pub fn normalized(mut self) -> Self {
        self.business_phone = digits_only(&self.business_phone);
        self
    }

    pub fn company(&self) -> CompanyProfile {
        CompanyProfile {
            company_name: self.business_name.clone(),
            address: self.business_address.clone(),
            phone: format_phone_number(&self.business_phone),
            email: self.business_email.clone(),
            website: self.business_website.clone(),
            logo_url: self.business_logo_url.clone(),
        }
    }

    /// Copy company details back onto the profile, as the proposal editor does.
    pub fn set_company(&mut self, company: &CompanyProfile) {
        self.business_name = company.company_name.clone();
        self.business_address = company.address.clone();
        self.business_phone = digits_only(&company.phone);
        self.business_email = company.email.clone();
        self.business_website = company.website.clone();
        self.business_logo_url = company.logo_url.clone();
    }
}

/// Company header shown on generated documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyProfile {
    pub company_name: String,
    pub address: String,
    /// Display form, e.g. `(555) 123-4567`.
    pub phone: String,
    pub email: String,
    pub website: String,
    pub logo_url: String,
}

impl CompanyProfile {
    /// Name, email and phone are all present.
    pub fn is_complete(&self) -> bool {
        !self.company_name.trim().is_empty()
            && !self.email.trim().is_empty()
            && !self.phone.trim().is_empty()
    }
}

pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Format up to ten digits as `(xxx) xxx-xxxx`, partially for shorter input.
pub fn format_phone_number(value: &str) -> String {
    let digits: String = digits_only(value).chars().take(10).collect();
    match digits.len() {
        0..=3 => digits,
        4..=6 => format!("({}) {}", &digits[..3], &digits[3..]),
        _ => format!("({}) {}-{}", &digits[..3], &digits[3..6], &digits[6..]),
    }
}
