//! Error taxonomy for the planner core.
//!
//! Transport-level failures are retried inside the providers and recovered by
//! fallback where possible; business-rule violations are surfaced verbatim and
//! never retried.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::session::ConversationId;

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("{count} locations exceed the brute-force limit of {max}")]
    TooManyLocations { count: usize, max: usize },

    #[error("input set has no start location")]
    MissingStart,

    #[error("input set has more than one start location")]
    MultipleStarts,

    #[error(transparent)]
    Routing(#[from] RoutingError),
}

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("routing request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("routing service returned status {0:?}")]
    ServiceStatus(String),

    #[error("routing service returned a malformed payload: {0}")]
    MalformedResponse(String),

    #[error("no route alternative satisfies the requested preference")]
    NoRouteMeetsPreference,
}

/// Persistence failure, transport-agnostic.
#[derive(Debug, Error)]
#[error("store operation failed: {message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("a plan needs at least one destination")]
    NoDestinations,

    #[error(transparent)]
    Optimize(#[from] OptimizeError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("plan {0} not found")]
    PlanNotFound(Uuid),

    #[error("plan {id} is dated {date} and can no longer be executed")]
    PlanExpired { id: Uuid, date: NaiveDate },

    #[error("no active session for conversation {0}")]
    SessionExpired(ConversationId),

    #[error("conversation {0} is not at a point where this event applies")]
    UnexpectedEvent(ConversationId),

    #[error("selection {choice} is out of range ({len} choices)")]
    InvalidSelection { choice: usize, len: usize },

    #[error("no validated location; send a location update first")]
    NoValidatedLocation,

    #[error("stop index {0} already has a recorded visit")]
    DuplicateEvidence(usize),

    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
