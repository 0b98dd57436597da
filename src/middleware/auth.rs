use axum::{
    extract::{rejection::QueryRejection, Query, Request, State},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;

/// Application credentials carried on webhook URLs, e.g.
/// `/webhooks/rackspace?application=test-app&key=abc`.
///
/// Vendors configure a fixed URL and cannot add headers, so credentials live
/// in the query string.
#[derive(Debug, Default, Deserialize)]
pub struct AppCredentials {
    pub application: Option<String>,
    pub key: Option<String>,
}

impl AppCredentials {
    /// Both parts, non-empty, or a client-facing reason why not
    fn required(&self) -> Result<(&str, &str), &'static str> {
        let application = self
            .application
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or("Missing application parameter")?;
        let key = self
            .key
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or("Missing key parameter")?;
        Ok((application, key))
    }
}

/// Middleware that authenticates the calling application and injects `AuthApp`
pub async fn app_auth_middleware(
    State(state): State<AppState>,
    credentials: Result<Query<AppCredentials>, QueryRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Query(credentials) = credentials.map_err(|e| {
        tracing::warn!("Rejected credential query string: {}", e);
        ApiError::unauthorized("Invalid credential parameters")
    })?;
    let (application, key) = credentials.required().map_err(ApiError::unauthorized)?;

    let app = state
        .applications
        .authenticate(application, key)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Application authentication failed for '{}'", application);
            ApiError::unauthorized("Authentication failed")
        })?;

    tracing::debug!("Authenticated application {} ({})", app.name, app.id);

    request.extensions_mut().insert(app);

    Ok(next.run(request).await)
}
