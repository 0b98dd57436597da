use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config;
use crate::database::{ApplicationDirectory, PgStore, SessionProvider};
use crate::handlers::{public, webhooks};
use crate::middleware::app_auth_middleware;

/// Shared handles passed to every handler; cloning is cheap
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionProvider>,
    pub applications: Arc<dyn ApplicationDirectory>,
}

impl AppState {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        applications: Arc<dyn ApplicationDirectory>,
    ) -> Self {
        Self {
            sessions,
            applications,
        }
    }

    /// Both storage seams backed by the same Postgres pool
    pub fn from_store(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store)
    }
}

pub fn app(state: AppState) -> Router {
    let settings = config::config();

    let mut router = Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Application-authenticated webhooks
        .merge(webhook_routes(state.clone()))
        .layer(DefaultBodyLimit::max(settings.api.max_request_size_bytes))
        .with_state(state);

    if settings.security.enable_cors {
        router = router.layer(cors_layer(&settings.security.cors_origins));
    }
    if settings.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
}

fn webhook_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/webhooks/rackspace", post(webhooks::rackspace::on_post))
        .route_layer(middleware::from_fn_with_state(state, app_auth_middleware))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect::<Vec<_>>();
    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}
