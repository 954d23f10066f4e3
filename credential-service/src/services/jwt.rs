use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{SessionConfig, MAX_TOKEN_EXPIRY_MINUTES};

/// Who a session token authenticates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    Guardian,
    Dependent,
}

/// Claims carried by session tokens (HS256).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (guardian or dependent ID)
    pub sub: String,
    /// Display name of the subject, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: SessionRole,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID; makes every minted token distinct
    pub jti: String,
}

/// Signs and verifies session tokens with the shared symmetric key.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_expiry_minutes: i64,
}

impl JwtService {
    pub fn new(config: &SessionConfig) -> Result<Self, anyhow::Error> {
        let secret = config.signing_secret.expose_secret();
        if secret.is_empty() {
            return Err(anyhow::anyhow!("Session signing secret must not be empty"));
        }
        if config.token_expiry_minutes <= 0 || config.token_expiry_minutes > MAX_TOKEN_EXPIRY_MINUTES
        {
            return Err(anyhow::anyhow!(
                "Session token expiry must be between 1 and {} minutes",
                MAX_TOKEN_EXPIRY_MINUTES
            ));
        }

        tracing::info!(
            expiry_minutes = config.token_expiry_minutes,
            "JWT service initialized with HS256 key"
        );

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_expiry_minutes: config.token_expiry_minutes,
        })
    }

    /// Mint a session token for `subject`.
    pub fn generate_session_token(
        &self,
        subject: &str,
        name: Option<&str>,
        role: SessionRole,
    ) -> Result<String, anyhow::Error> {
        let now = Utc::now();
        let exp = Duration::try_minutes(self.token_expiry_minutes)
            .and_then(|validity| now.checked_add_signed(validity))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Session token expiry of {} minutes is out of range",
                    self.token_expiry_minutes
                )
            })?;

        let claims = SessionClaims {
            sub: subject.to_string(),
            name: name.map(str::to_string),
            role,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))
    }

    /// Verify signature and expiry and return the claims.
    pub fn validate_session_token(&self, token: &str) -> Result<SessionClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        let token_data = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid session token: {}", e))?;

        Ok(token_data.claims)
    }

    /// Session token lifetime in seconds.
    pub fn token_expiry_seconds(&self) -> i64 {
        self.token_expiry_minutes.saturating_mul(60)
    }
}
