use axum::{
    body::Bytes,
    extract::{Extension, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::Value;
use tracing::{info, warn};

use crate::app::AppState;
use crate::database::models::{AuthApp, NewIncident};
use crate::error::ApiError;
use crate::webhooks::rackspace::{create_context, validate_post};
use crate::webhooks::WebhookError;

/**
 * POST /webhooks/rackspace - create an incident from a Rackspace Monitoring alert
 *
 * Configure the Rackspace notification (through the API, not the web console)
 * with a webhook URL carrying the Iris application credentials and the plan
 * name in its metadata:
 *
 * ```json
 * {
 *   "label": "my webhook #1",
 *   "type": "webhook",
 *   "details": {
 *     "url": "http://iris:16649/webhooks/rackspace?application=test-app&key=abc"
 *   },
 *   "metadata": { "iris_plan": "teamA" }
 * }
 * ```
 *
 * Every accepted POST creates a new incident; there is no deduplication.
 *
 * Responses:
 * - 201 with `Location: /incidents/<id>` and the id as the JSON body
 * - 400 missing keys, malformed JSON, context over 64KiB, or no template for the app
 * - 404 plan missing or inactive
 */
pub async fn on_post(
    State(state): State<AppState>,
    Extension(app): Extension<AuthApp>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::invalid_json(format!("Invalid JSON body: {}", e)))?;

    let alert = validate_post(payload)?;

    // Size check runs before the session opens so oversized alerts never touch the database
    let context = create_context(&alert.payload)?;

    let incident_id = create_incident(&state, &app, &alert.metadata.iris_plan, context).await?;

    info!(
        incident_id,
        application = %app.name,
        plan = %alert.metadata.iris_plan,
        "Created incident from rackspace alert"
    );

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/incidents/{}", incident_id))],
        Json(incident_id),
    ))
}

/// Plan lookup, template check and insert inside one transaction.
///
/// Any early return drops the session uncommitted, which rolls it back.
async fn create_incident(
    state: &AppState,
    app: &AuthApp,
    plan_name: &str,
    context: String,
) -> Result<i64, WebhookError> {
    let mut session = state.sessions.guarded_session().await?;

    let plan_id = session
        .active_plan_id(plan_name)
        .await?
        .ok_or_else(|| WebhookError::PlanNotFound(plan_name.to_string()))?;

    if !session.plan_template_exists(plan_id, app.id).await? {
        warn!(
            plan_id,
            application_id = app.id,
            "no plan template exists for this app"
        );
        return Err(WebhookError::NoTemplate {
            plan_id,
            application_id: app.id,
        });
    }

    let incident = NewIncident::new(plan_id, app.id, context);
    let incident_id = session.insert_incident(&incident).await?;

    session.commit().await?;

    Ok(incident_id)
}
