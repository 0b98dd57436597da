#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, Response},
    Router,
};
use iris_api_rust::database::models::{AuthApp, NewIncident};
use iris_api_rust::database::{
    ApplicationDirectory, DatabaseError, IncidentSession, SessionProvider,
};
use iris_api_rust::{app, AppState};
use serde_json::Value;
use tower::ServiceExt;

pub const APP_NAME: &str = "test-app";
pub const APP_KEY: &str = "abc";
pub const APP_ID: i64 = 7;
pub const PLAN_NAME: &str = "teamA";
pub const PLAN_ID: i64 = 42;

#[derive(Default)]
struct Inner {
    plans: Vec<(String, i64)>,
    templates: HashSet<(i64, i64)>,
    applications: Vec<(String, String, AuthApp)>,
    incidents: Vec<(i64, NewIncident)>,
    sessions_opened: usize,
    commits: usize,
    rollbacks: usize,
    fail_inserts: bool,
    fail_ping: bool,
}

/// In-memory stand-in for the Postgres store, with transaction bookkeeping
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Store seeded with application 7, plan teamA -> 42 and a template for (42, 7)
    pub fn seeded() -> Self {
        let store = Self::default();
        store.add_application(APP_NAME, APP_KEY, APP_ID);
        store.add_plan(PLAN_NAME, PLAN_ID);
        store.add_template(PLAN_ID, APP_ID);
        store
    }

    pub fn add_application(&self, name: &str, key: &str, id: i64) {
        self.inner.lock().unwrap().applications.push((
            name.to_string(),
            key.to_string(),
            AuthApp { id, name: name.to_string() },
        ));
    }

    pub fn add_plan(&self, name: &str, plan_id: i64) {
        self.inner.lock().unwrap().plans.push((name.to_string(), plan_id));
    }

    pub fn add_template(&self, plan_id: i64, application_id: i64) {
        self.inner.lock().unwrap().templates.insert((plan_id, application_id));
    }

    pub fn fail_inserts(&self) {
        self.inner.lock().unwrap().fail_inserts = true;
    }

    pub fn fail_ping(&self) {
        self.inner.lock().unwrap().fail_ping = true;
    }

    pub fn incidents(&self) -> Vec<(i64, NewIncident)> {
        self.inner.lock().unwrap().incidents.clone()
    }

    pub fn sessions_opened(&self) -> usize {
        self.inner.lock().unwrap().sessions_opened
    }

    pub fn commits(&self) -> usize {
        self.inner.lock().unwrap().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.inner.lock().unwrap().rollbacks
    }

    pub fn router(&self) -> Router {
        app(AppState::new(Arc::new(self.clone()), Arc::new(self.clone())))
    }
}

#[async_trait]
impl SessionProvider for MemoryStore {
    async fn guarded_session(&self) -> Result<Box<dyn IncidentSession>, DatabaseError> {
        self.inner.lock().unwrap().sessions_opened += 1;
        Ok(Box::new(MemorySession {
            inner: self.inner.clone(),
            staged: Vec::new(),
            committed: false,
        }))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        if self.inner.lock().unwrap().fail_ping {
            return Err(DatabaseError::ConnectionError(
                "connection refused by db.internal:5432 for user iris".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ApplicationDirectory for MemoryStore {
    async fn authenticate(&self, name: &str, key: &str) -> Result<Option<AuthApp>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .applications
            .iter()
            .find(|(n, k, _)| n == name && k == key)
            .map(|(_, _, app)| app.clone()))
    }
}

struct MemorySession {
    inner: Arc<Mutex<Inner>>,
    staged: Vec<NewIncident>,
    committed: bool,
}

#[async_trait]
impl IncidentSession for MemorySession {
    async fn active_plan_id(&mut self, plan_name: &str) -> Result<Option<i64>, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .plans
            .iter()
            .find(|(name, _)| name == plan_name)
            .map(|(_, id)| *id))
    }

    async fn plan_template_exists(
        &mut self,
        plan_id: i64,
        application_id: i64,
    ) -> Result<bool, DatabaseError> {
        Ok(self.inner.lock().unwrap().templates.contains(&(plan_id, application_id)))
    }

    async fn insert_incident(&mut self, incident: &NewIncident) -> Result<i64, DatabaseError> {
        let inner = self.inner.lock().unwrap();
        if inner.fail_inserts {
            return Err(DatabaseError::Sqlx(sqlx_error()));
        }
        self.staged.push(incident.clone());
        Ok((inner.incidents.len() + self.staged.len()) as i64)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), DatabaseError> {
        let staged = std::mem::take(&mut self.staged);
        let mut inner = self.inner.lock().unwrap();
        for incident in staged {
            let id = inner.incidents.len() as i64 + 1;
            inner.incidents.push((id, incident));
        }
        inner.commits += 1;
        self.committed = true;
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        if !self.committed {
            if let Ok(mut inner) = self.inner.lock() {
                inner.rollbacks += 1;
            }
        }
    }
}

fn sqlx_error() -> sqlx::Error {
    sqlx::Error::Protocol("insert failed".to_string())
}

pub fn rackspace_uri() -> String {
    format!("/webhooks/rackspace?application={}&key={}", APP_NAME, APP_KEY)
}

pub fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

pub async fn send(router: Router, request: Request<Body>) -> Response<Body> {
    router.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
