use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Calling application, resolved from request credentials by the auth middleware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AuthApp {
    pub id: i64,
    pub name: String,
}
