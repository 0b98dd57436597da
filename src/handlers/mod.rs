// handlers/mod.rs - two security tiers
//
// public:   no authentication (/, /health)
// webhooks: application key authentication via query string (/webhooks/*)
pub mod public;
pub mod webhooks;
