pub mod application;
pub mod incident;

pub use application::AuthApp;
pub use incident::NewIncident;
