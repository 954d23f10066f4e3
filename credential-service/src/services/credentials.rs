use std::sync::Arc;

use crate::{
    dtos::credential::{CredentialSummary, IntrospectResponse},
    models::{AccessCredential, Dependent, Guardian},
    services::{
        metrics, AccountDirectory, CredentialError, CredentialStore, JwtService, SessionRole,
    },
    utils::{generate_secret, ImageRenderer},
};

#[derive(Debug, Clone, Copy)]
pub struct IssueOptions {
    pub return_image: bool,
}

impl Default for IssueOptions {
    fn default() -> Self {
        Self { return_image: true }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedCredential {
    pub secret: String,
    pub image_data_uri: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExchangedSession {
    pub session_token: String,
    pub dependent_id: String,
    pub expires_in: i64,
}

/// Issues, exchanges and revokes dependent login credentials.
#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn CredentialStore>,
    directory: Arc<dyn AccountDirectory>,
    jwt: JwtService,
    renderer: Arc<dyn ImageRenderer>,
}

impl CredentialService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        directory: Arc<dyn AccountDirectory>,
        jwt: JwtService,
        renderer: Arc<dyn ImageRenderer>,
    ) -> Self {
        Self {
            store,
            directory,
            jwt,
            renderer,
        }
    }

    /// Resolve both accounts and require that the guardian manages the
    /// dependent. Used by issuance and by the guardian-facing handlers.
    pub async fn ensure_ownership(
        &self,
        guardian_id: &str,
        dependent_id: &str,
    ) -> Result<(Guardian, Dependent), CredentialError> {
        let guardian = self
            .directory
            .find_guardian(guardian_id)
            .await
            .map_err(CredentialError::Store)?
            .ok_or(CredentialError::GuardianNotFound)?;

        let dependent = self
            .directory
            .find_dependent(dependent_id)
            .await
            .map_err(CredentialError::Store)?
            .ok_or(CredentialError::DependentNotFound)?;

        if !guardian.manages(&dependent.id) {
            tracing::warn!(
                guardian_id = %guardian.id,
                dependent_id = %dependent.id,
                "Guardian attempted to act on a dependent they do not manage"
            );
            return Err(CredentialError::OwnershipMismatch);
        }

        Ok((guardian, dependent))
    }

    /// Authorize listing or revoking a dependent's credentials.
    ///
    /// Same checks as [`Self::ensure_ownership`], except that once the
    /// dependent account is gone a guardian may still clean up credentials
    /// they issued for it.
    pub async fn ensure_can_manage_credentials(
        &self,
        guardian_id: &str,
        dependent_id: &str,
    ) -> Result<(), CredentialError> {
        match self.ensure_ownership(guardian_id, dependent_id).await {
            Ok(_) => Ok(()),
            Err(CredentialError::DependentNotFound) => {
                let issued_by_caller = self
                    .store
                    .list_by_dependent(dependent_id)
                    .await
                    .map_err(CredentialError::Store)?
                    .iter()
                    .any(|credential| credential.guardian_id == guardian_id);

                if !issued_by_caller {
                    return Err(CredentialError::DependentNotFound);
                }

                tracing::info!(
                    guardian_id,
                    dependent_id,
                    "Dependent no longer exists; allowing cleanup of guardian-issued credentials"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    #[tracing::instrument(skip(self, options))]
    pub async fn issue(
        &self,
        guardian_id: &str,
        dependent_id: &str,
        options: IssueOptions,
    ) -> Result<IssuedCredential, CredentialError> {
        let (guardian, dependent) = self.ensure_ownership(guardian_id, dependent_id).await?;

        let credential = AccessCredential::new(generate_secret(), &dependent.id, &guardian.id);
        self.store
            .create(&credential)
            .await
            .map_err(CredentialError::Store)?;

        metrics::record_issued();
        tracing::info!(
            credential_id = %credential.id,
            dependent_id = %dependent.id,
            guardian_id = %guardian.id,
            "Access credential issued"
        );

        let image_data_uri = if options.return_image {
            match self.renderer.render(&credential.secret) {
                Ok(uri) => Some(uri),
                Err(e) => {
                    metrics::record_qr_render_failure();
                    tracing::warn!(
                        credential_id = %credential.id,
                        error = %e,
                        "QR rendering failed; returning secret without image"
                    );
                    None
                }
            }
        } else {
            None
        };

        Ok(IssuedCredential {
            secret: credential.secret,
            image_data_uri,
        })
    }

    #[tracing::instrument(skip_all)]
    pub async fn exchange(&self, secret: &str) -> Result<ExchangedSession, CredentialError> {
        let secret = secret.trim();
        if secret.is_empty() {
            metrics::record_exchange("invalid");
            return Err(CredentialError::InvalidArgument(
                "secret is required".to_string(),
            ));
        }

        let credential = match self.store.find_by_secret(secret).await {
            Ok(Some(credential)) => credential,
            Ok(None) => {
                metrics::record_exchange("not_found");
                tracing::info!("Exchange attempted with unknown secret");
                return Err(CredentialError::CredentialNotFound);
            }
            Err(e) => {
                metrics::record_exchange("error");
                return Err(CredentialError::Store(e));
            }
        };

        let dependent = match self.directory.find_dependent(&credential.dependent_id).await {
            Ok(Some(dependent)) => dependent,
            Ok(None) => {
                metrics::record_exchange("not_found");
                tracing::warn!(
                    credential_id = %credential.id,
                    dependent_id = %credential.dependent_id,
                    "Credential references a dependent that no longer exists"
                );
                return Err(CredentialError::DependentNotFound);
            }
            Err(e) => {
                metrics::record_exchange("error");
                return Err(CredentialError::Store(e));
            }
        };

        let session_token = self
            .jwt
            .generate_session_token(
                &dependent.id,
                Some(&dependent.display_name),
                SessionRole::Dependent,
            )
            .map_err(|e| {
                metrics::record_exchange("error");
                CredentialError::SigningFailure(e)
            })?;

        metrics::record_exchange("success");
        tracing::info!(
            credential_id = %credential.id,
            dependent_id = %dependent.id,
            "Credential exchanged for session token"
        );

        Ok(ExchangedSession {
            session_token,
            dependent_id: dependent.id,
            expires_in: self.jwt.token_expiry_seconds(),
        })
    }

    /// Delete every credential of the dependent, whoever issued it.
    ///
    /// Callers are responsible for authorization.
    #[tracing::instrument(skip(self))]
    pub async fn revoke_all(&self, dependent_id: &str) -> Result<u64, CredentialError> {
        let deleted = self
            .store
            .delete_by_dependent(dependent_id)
            .await
            .map_err(CredentialError::Store)?;

        metrics::record_revoked(deleted);
        tracing::info!(deleted_count = deleted, "Credentials revoked");

        Ok(deleted)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, dependent_id: &str) -> Result<Vec<CredentialSummary>, CredentialError> {
        let credentials = self
            .store
            .list_by_dependent(dependent_id)
            .await
            .map_err(CredentialError::Store)?;

        Ok(credentials.iter().map(CredentialSummary::from).collect())
    }

    pub fn introspect(&self, token: &str) -> IntrospectResponse {
        match self.jwt.validate_session_token(token.trim()) {
            Ok(claims) => IntrospectResponse {
                active: true,
                sub: Some(claims.sub),
                name: claims.name,
                role: Some(
                    match claims.role {
                        SessionRole::Guardian => "guardian",
                        SessionRole::Dependent => "dependent",
                    }
                    .to_string(),
                ),
                exp: Some(claims.exp),
            },
            Err(e) => {
                tracing::debug!(error = %e, "Inactive session token presented for introspection");
                IntrospectResponse::inactive()
            }
        }
    }

    pub async fn health_check(&self) -> Result<(), anyhow::Error> {
        self.store.health_check().await
    }
}
