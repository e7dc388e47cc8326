//! ProfitPilot: bid pricing, proposals and invoices for contractors.
//!
//! The pricing engine in [`pricing`] is pure. Everything that touches storage
//! goes through the [`db::Database`] trait, and every AI feature goes through
//! [`llm::GenerationService`] with a deterministic fallback.

pub mod analytics;
pub mod bids;
pub mod config;
pub mod db;
pub mod error;
pub mod invoices;
pub mod llm;
pub mod notify;
pub mod pricing;
pub mod profile;
pub mod proposals;
pub mod retry;
pub mod setup;
pub mod web;
