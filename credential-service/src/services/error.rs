use service_core::error::AppError;
use thiserror::Error;

/// Failures of the credential operations.
///
/// Store and signing errors are wrapped here so driver and library errors
/// never leave the service layer.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Guardian not found")]
    GuardianNotFound,

    #[error("Dependent not found")]
    DependentNotFound,

    #[error("Credential not found")]
    CredentialNotFound,

    #[error("Dependent is not managed by this guardian")]
    OwnershipMismatch,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to sign session token: {0}")]
    SigningFailure(anyhow::Error),

    #[error("Credential store error: {0}")]
    Store(anyhow::Error),
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::GuardianNotFound => {
                AppError::NotFound(anyhow::anyhow!("Guardian not found"))
            }
            CredentialError::DependentNotFound => {
                AppError::NotFound(anyhow::anyhow!("Dependent not found"))
            }
            CredentialError::CredentialNotFound => {
                AppError::NotFound(anyhow::anyhow!("Credential not found"))
            }
            CredentialError::OwnershipMismatch => AppError::Forbidden(anyhow::anyhow!(
                "Dependent is not managed by this guardian"
            )),
            CredentialError::InvalidArgument(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            CredentialError::SigningFailure(e) => {
                AppError::InternalError(e.context("Session token signing failed"))
            }
            CredentialError::Store(e) => AppError::DatabaseError(e),
        }
    }
}
