pub mod manager;
pub mod models;
pub mod session;

pub use manager::{DatabaseError, DatabaseManager};
pub use session::{ApplicationDirectory, IncidentSession, PgStore, SessionProvider};
