//! HTTP handlers for credential-service.

pub mod credentials;
pub mod health;
pub mod metrics;

pub use credentials::*;
pub use health::*;
