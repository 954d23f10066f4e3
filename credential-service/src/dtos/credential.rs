use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::AccessCredential;

/// Body of an issue request. The whole body is optional.
///
/// Unknown fields (including the retired `ttlSeconds`) are ignored.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueCredentialRequest {
    /// Render the secret as a PNG QR code. Defaults to true.
    #[schema(example = true)]
    pub return_image: Option<bool>,
}

impl IssueCredentialRequest {
    pub fn return_image(&self) -> bool {
        self.return_image.unwrap_or(true)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueCredentialResponse {
    #[schema(example = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")]
    pub secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "data:image/png;base64,iVBORw0KGgo...")]
    pub image_data_uri: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ExchangeRequest {
    #[validate(length(max = 512, message = "Secret is too long"))]
    #[schema(example = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")]
    pub secret: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeResponse {
    pub session_token: String,
    #[schema(example = "65a1f0c2e4b0a1b2c3d4e5f6")]
    pub dependent_id: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Session token lifetime in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RevokeCredentialsResponse {
    #[schema(example = 3)]
    pub deleted_count: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSummary {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    pub guardian_id: String,
    pub issued_at: DateTime<Utc>,
    /// First 8 characters of the secret
    #[schema(example = "9f86d081")]
    pub secret_hint: String,
}

impl From<&AccessCredential> for CredentialSummary {
    fn from(credential: &AccessCredential) -> Self {
        Self {
            id: credential.id.clone(),
            guardian_id: credential.guardian_id.clone(),
            issued_at: credential.issued_at_utc(),
            secret_hint: credential.secret_hint(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListCredentialsResponse {
    pub dependent_id: String,
    pub count: usize,
    pub credentials: Vec<CredentialSummary>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct IntrospectRequest {
    #[validate(length(max = 8192, message = "Token is too long"))]
    pub token: String,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct IntrospectResponse {
    #[schema(example = true)]
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Ada")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "dependent")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = 1704326400)]
    pub exp: Option<i64>,
}

impl IntrospectResponse {
    pub fn inactive() -> Self {
        Self::default()
    }
}
