//! Vendor alert payloads accepted by the webhook endpoints.
//!
//! Each vendor module validates its payload into a typed alert before any
//! database work happens; the handlers in `crate::handlers::webhooks` own the
//! transaction.

pub mod rackspace;

use thiserror::Error;

use crate::database::DatabaseError;

/// Upper bound on the serialized incident context, the size of the `incident.context` column
pub const MAX_CONTEXT_LENGTH: usize = 65_535;

/// Failures while turning a vendor alert into an incident
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("{0}")]
    Validation(String),

    #[error("plan '{0}' not found or inactive")]
    PlanNotFound(String),

    #[error("context is {size} bytes, limit is {limit}")]
    ContextTooLarge { size: usize, limit: usize },

    #[error("no plan template actions exist for application {application_id} under plan {plan_id}")]
    NoTemplate { plan_id: i64, application_id: i64 },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}
