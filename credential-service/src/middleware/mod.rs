pub mod auth;

pub use auth::{guardian_auth_middleware, AuthGuardian};
