//! service-core: shared infrastructure for the identity backend.
pub mod config;
pub mod error;
pub mod observability;
pub mod response;

pub use axum;
pub use tracing;
pub use validator;
