//! Services layer for credential-service.

mod credentials;
mod database;
mod directory;
pub mod error;
mod jwt;
pub mod metrics;
mod store;

pub use credentials::{CredentialService, ExchangedSession, IssueOptions, IssuedCredential};
pub use database::MongoDb;
pub use directory::{AccountDirectory, MockAccountDirectory, MongoAccountDirectory};
pub use error::CredentialError;
pub use jwt::{JwtService, SessionClaims, SessionRole};
pub use metrics::{get_metrics, init_metrics};
pub use store::{CredentialStore, MockCredentialStore, MongoCredentialStore};
