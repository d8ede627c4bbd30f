//! HTTP surface of the gateway

pub mod handler;
pub mod routes;
pub mod state;

pub use routes::{build_router, serve, INDEX_HTML};
pub use state::AppState;
