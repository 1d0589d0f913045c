//! Reference users service built on the binding extractors.

pub mod app;
pub mod config;
pub mod handlers;
pub mod models;
pub mod state;
pub mod store;

pub use app::build_router;
pub use config::ServerArgs;
pub use state::AppState;
