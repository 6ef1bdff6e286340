// Library interface for komik_gateway
// The binary and the integration tests both build on these modules

pub mod app_state;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod headers;
pub mod http_client;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod routes;
pub mod sources;
pub mod updates;
