//! service-core: shared HTTP infrastructure for the credential services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
