//! service-core: Shared infrastructure for lifecycle microservices.
pub mod error;
pub mod observability;

pub use tracing;
pub use validator;
