//! Transaction-scoped sessions for the webhook handlers.
//!
//! A session wraps one database transaction. `commit` consumes it; dropping it
//! any other way (early return, `?`, panic) rolls the transaction back and
//! returns the connection to the pool.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use super::manager::DatabaseError;
use super::models::{AuthApp, NewIncident};

/// Hands out one guarded session per request
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn guarded_session(&self) -> Result<Box<dyn IncidentSession>, DatabaseError>;

    /// Cheap connectivity probe for the health endpoint
    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// Operations available inside one transaction
#[async_trait]
pub trait IncidentSession: Send {
    /// Id of the active plan with this name, if any
    async fn active_plan_id(&mut self, plan_name: &str) -> Result<Option<i64>, DatabaseError>;

    /// Whether any notification template of the plan has content for the application
    async fn plan_template_exists(
        &mut self,
        plan_id: i64,
        application_id: i64,
    ) -> Result<bool, DatabaseError>;

    /// Insert an incident and return its generated id
    async fn insert_incident(&mut self, incident: &NewIncident) -> Result<i64, DatabaseError>;

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError>;
}

/// Resolves application credentials to the calling application
#[async_trait]
pub trait ApplicationDirectory: Send + Sync {
    async fn authenticate(&self, name: &str, key: &str) -> Result<Option<AuthApp>, DatabaseError>;
}

/// Hex SHA-256 of an application key, as stored in `application.key_hash`
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Postgres-backed implementation of the storage traits
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionProvider for PgStore {
    async fn guarded_session(&self) -> Result<Box<dyn IncidentSession>, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSession { tx }))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ApplicationDirectory for PgStore {
    async fn authenticate(&self, name: &str, key: &str) -> Result<Option<AuthApp>, DatabaseError> {
        let app = sqlx::query_as::<_, AuthApp>(
            "SELECT id, name FROM application WHERE name = $1 AND key_hash = $2",
        )
        .bind(name)
        .bind(hash_key(key))
        .fetch_optional(&self.pool)
        .await?;

        Ok(app)
    }
}

struct PgSession {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl IncidentSession for PgSession {
    async fn active_plan_id(&mut self, plan_name: &str) -> Result<Option<i64>, DatabaseError> {
        let plan_id: Option<i64> =
            sqlx::query_scalar("SELECT plan_id FROM plan_active WHERE name = $1")
                .bind(plan_name)
                .fetch_optional(&mut *self.tx)
                .await?;

        Ok(plan_id)
    }

    async fn plan_template_exists(
        &mut self,
        plan_id: i64,
        application_id: i64,
    ) -> Result<bool, DatabaseError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM plan_notification
                JOIN template ON template.name = plan_notification.template
                JOIN template_content ON template_content.template_id = template.id
                WHERE plan_notification.plan_id = $1
                AND template_content.application_id = $2
            )
            "#,
        )
        .bind(plan_id)
        .bind(application_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    async fn insert_incident(&mut self, incident: &NewIncident) -> Result<i64, DatabaseError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO incident (plan_id, created, context, current_step, active, application_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(incident.plan_id)
        .bind(incident.created)
        .bind(&incident.context)
        .bind(incident.current_step)
        .bind(incident.active)
        .bind(incident.application_id)
        .fetch_one(&mut *self.tx)
        .await?;

        debug!(incident_id = id, "Inserted incident row");
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<(), DatabaseError> {
        self.tx.commit().await?;
        Ok(())
    }
}
