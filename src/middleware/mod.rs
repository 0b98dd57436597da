pub mod auth;
pub mod response;

pub use auth::{app_auth_middleware, AppCredentials};
pub use response::ApiResponse;
