use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Incident row as inserted by the webhook handlers.
///
/// `current_step` starts at 0 (first step of the plan) and `active` at true;
/// the incident processor owns both after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewIncident {
    pub plan_id: i64,
    pub application_id: i64,
    pub created: DateTime<Utc>,
    pub context: String,
    pub current_step: i32,
    pub active: bool,
}

impl NewIncident {
    pub fn new(plan_id: i64, application_id: i64, context: String) -> Self {
        Self {
            plan_id,
            application_id,
            created: Utc::now(),
            context,
            current_step: 0,
            active: true,
        }
    }
}
