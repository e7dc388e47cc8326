//! Public proposal link.
//!
//! Unauthenticated routes a client uses to view a shared proposal and
//! respond to it once:
//!
//! - `GET /proposals/{id}`: the stored proposal document, or a thank-you page
//!   once a response exists.
//! - `GET /proposals/{id}/response`: the recorded response, if any.
//! - `POST /proposals/{id}/response`: record `accepted`, `rejected` or
//!   `changes_requested`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use uuid::Uuid;

use crate::db::Database;
use crate::error::ProposalError;
use crate::notify::Notifier;
use crate::proposals::{
    PublicProposal, ResponseSubmission, escape_html, load_public_proposal, submit_response,
};

const INVALID_LINK: &str = "This proposal link is invalid.";
const LOAD_FAILED: &str =
    "This proposal could not be loaded. It may have been removed or the link may be incorrect.";

#[derive(Clone)]
pub struct WebState {
    pub db: Arc<dyn Database>,
    pub notifier: Arc<dyn Notifier>,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/proposals/{bid_id}", get(view_proposal))
        .route(
            "/proposals/{bid_id}/response",
            get(get_response).post(post_response),
        )
        .with_state(state)
}

async fn health_check() -> &'static str {
    "ok"
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title></head>\
         <body style=\"background: #f1f5f9; margin: 0;\">{}</body></html>",
        escape_html(title),
        body
    )
}

fn error_page(status: StatusCode, message: &str) -> Response {
    let body = format!(
        "<div style=\"text-align: center; padding: 80px 20px;\"><h2>Error</h2><p>{}</p></div>",
        escape_html(message)
    );
    (status, Html(page("Proposal", &body))).into_response()
}

fn proposal_page(proposal: &PublicProposal) -> String {
    if proposal.existing_response.is_some() {
        return page(
            "Thank You",
            "<div style=\"text-align: center; padding: 80px 20px;\"><h2>Thank You!</h2>\
             <p>Your response has been recorded. The contractor has been notified.</p></div>",
        );
    }
    let body = format!(
        "<div style=\"max-width: 900px; margin: 0 auto; background: #ffffff;\">{}</div>",
        proposal.html
    );
    page(&format!("Proposal: {}", proposal.bid.title()), &body)
}

async fn view_proposal(
    State(state): State<WebState>,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(bid_id) = parse_id(&raw_id) else {
        return error_page(StatusCode::NOT_FOUND, INVALID_LINK);
    };

    match load_public_proposal(state.db.as_ref(), bid_id).await {
        Ok(proposal) => Html(proposal_page(&proposal)).into_response(),
        Err(e) => {
            tracing::warn!("Public proposal {} unavailable: {}", bid_id, e);
            let status = match e {
                ProposalError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::NOT_FOUND,
            };
            error_page(status, LOAD_FAILED)
        }
    }
}

fn error_json(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn proposal_error(e: ProposalError) -> Response {
    let status = match &e {
        ProposalError::BidNotFound(_) | ProposalError::NotGenerated(_) => StatusCode::NOT_FOUND,
        ProposalError::AlreadyResponded => StatusCode::CONFLICT,
        ProposalError::InvalidResponse(_) => StatusCode::BAD_REQUEST,
        ProposalError::NotPersisted(_) | ProposalError::Database(_) => {
            tracing::error!("Proposal response failed: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    error_json(status, e.to_string())
}

async fn get_response(
    State(state): State<WebState>,
    Path(raw_id): Path<String>,
) -> Response {
    let Some(bid_id) = parse_id(&raw_id) else {
        return error_json(StatusCode::NOT_FOUND, INVALID_LINK);
    };
    match load_public_proposal(state.db.as_ref(), bid_id).await {
        Ok(proposal) => Json(json!({ "response": proposal.existing_response })).into_response(),
        Err(e) => proposal_error(e),
    }
}

async fn post_response(
    State(state): State<WebState>,
    Path(raw_id): Path<String>,
    Json(submission): Json<ResponseSubmission>,
) -> Response {
    let Some(bid_id) = parse_id(&raw_id) else {
        return error_json(StatusCode::NOT_FOUND, INVALID_LINK);
    };
    match submit_response(
        state.db.as_ref(),
        state.notifier.as_ref(),
        bid_id,
        submission,
    )
    .await
    {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => proposal_error(e),
    }
}
