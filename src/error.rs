//! Error types for the pricing, persistence, and generation layers.

use std::time::Duration;

use uuid::Uuid;

/// Errors from the entity store.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("{entity} for {id} already exists")]
    Duplicate { entity: &'static str, id: Uuid },
}

impl From<deadpool_postgres::PoolError> for DatabaseError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        DatabaseError::Pool(err.to_string())
    }
}

/// Errors from the text/JSON generation service.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rejected credentials")]
    AuthFailed { provider: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Provider {provider} returned an invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Validation failures caught before an explicit save.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("{field} must not be negative")]
    NegativeAmount { field: String },

    #[error("{field} is not a number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("Category name must not be empty")]
    EmptyCategoryName,
}

/// Errors from bid list and bid editing operations.
#[derive(Debug, thiserror::Error)]
pub enum BidError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("The example bid cannot be modified or deleted")]
    ExampleBid,
}

/// Errors from proposal generation and the public proposal link.
#[derive(Debug, thiserror::Error)]
pub enum ProposalError {
    #[error("Bid {0} not found")]
    BidNotFound(Uuid),

    #[error("Proposal content could not be saved: {0}")]
    NotPersisted(DatabaseError),

    #[error("No proposal has been generated for bid {0}")]
    NotGenerated(Uuid),

    #[error("A response has already been recorded for this proposal")]
    AlreadyResponded,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

/// Errors from owner notifications.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}
