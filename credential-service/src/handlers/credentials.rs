use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        credential::{
            ExchangeRequest, ExchangeResponse, IntrospectRequest, IntrospectResponse,
            IssueCredentialRequest, IssueCredentialResponse, ListCredentialsResponse,
            RevokeCredentialsResponse,
        },
        ErrorResponse,
    },
    middleware::AuthGuardian,
    services::IssueOptions,
    utils::ValidatedJson,
    AppState,
};

/// Issue a new login credential for a dependent
#[utoipa::path(
    post,
    path = "/credentials/dependents/{dependent_id}/issue",
    params(("dependent_id" = String, Path, description = "Dependent to issue the credential for")),
    request_body(content = IssueCredentialRequest, description = "Optional; the image is rendered by default"),
    responses(
        (status = 201, description = "Credential issued", body = IssueCredentialResponse),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 401, description = "Missing or invalid guardian token", body = ErrorResponse),
        (status = 403, description = "Dependent not managed by this guardian", body = ErrorResponse),
        (status = 404, description = "Guardian or dependent not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Credentials"
)]
pub async fn issue_credential(
    State(state): State<AppState>,
    guardian: AuthGuardian,
    Path(dependent_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    // An absent body is the common case from mobile clients
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        IssueCredentialRequest::default()
    } else {
        serde_json::from_slice::<IssueCredentialRequest>(&body).map_err(|e| {
            AppError::BadRequest(anyhow::anyhow!("Json parse error: {}", e))
        })?
    };

    let issued = state
        .credentials
        .issue(
            guardian.guardian_id(),
            &dependent_id,
            IssueOptions {
                return_image: req.return_image(),
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssueCredentialResponse {
            secret: issued.secret,
            image_data_uri: issued.image_data_uri,
        }),
    ))
}

/// List a dependent's outstanding credentials, newest first
#[utoipa::path(
    get,
    path = "/credentials/dependents/{dependent_id}",
    params(("dependent_id" = String, Path, description = "Dependent whose credentials to list")),
    responses(
        (status = 200, description = "Outstanding credentials", body = ListCredentialsResponse),
        (status = 401, description = "Missing or invalid guardian token", body = ErrorResponse),
        (status = 403, description = "Dependent not managed by this guardian", body = ErrorResponse),
        (status = 404, description = "Guardian or dependent not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Credentials"
)]
pub async fn list_credentials(
    State(state): State<AppState>,
    guardian: AuthGuardian,
    Path(dependent_id): Path<String>,
) -> Result<Json<ListCredentialsResponse>, AppError> {
    state
        .credentials
        .ensure_can_manage_credentials(guardian.guardian_id(), &dependent_id)
        .await?;

    let credentials = state.credentials.list(&dependent_id).await?;

    Ok(Json(ListCredentialsResponse {
        dependent_id,
        count: credentials.len(),
        credentials,
    }))
}

/// Revoke every credential of a dependent
#[utoipa::path(
    delete,
    path = "/credentials/dependents/{dependent_id}",
    params(("dependent_id" = String, Path, description = "Dependent whose credentials to revoke")),
    responses(
        (status = 200, description = "Credentials revoked", body = RevokeCredentialsResponse),
        (status = 401, description = "Missing or invalid guardian token", body = ErrorResponse),
        (status = 403, description = "Dependent not managed by this guardian", body = ErrorResponse),
        (status = 404, description = "Guardian or dependent not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Credentials"
)]
pub async fn revoke_credentials(
    State(state): State<AppState>,
    guardian: AuthGuardian,
    Path(dependent_id): Path<String>,
) -> Result<Json<RevokeCredentialsResponse>, AppError> {
    state
        .credentials
        .ensure_can_manage_credentials(guardian.guardian_id(), &dependent_id)
        .await?;

    let deleted_count = state.credentials.revoke_all(&dependent_id).await?;

    tracing::info!(
        guardian_id = %guardian.guardian_id(),
        dependent_id = %dependent_id,
        deleted_count,
        "Guardian revoked dependent credentials"
    );

    Ok(Json(RevokeCredentialsResponse { deleted_count }))
}

/// Exchange a scanned credential for a dependent session token
#[utoipa::path(
    post,
    path = "/credentials/exchange",
    request_body = ExchangeRequest,
    responses(
        (status = 200, description = "Session token minted", body = ExchangeResponse),
        (status = 400, description = "Empty or malformed secret", body = ErrorResponse),
        (status = 404, description = "Unknown credential or deleted dependent", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Credentials"
)]
pub async fn exchange_credential(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ExchangeRequest>,
) -> Result<Json<ExchangeResponse>, AppError> {
    let session = state.credentials.exchange(&req.secret).await?;

    Ok(Json(ExchangeResponse {
        session_token: session.session_token,
        dependent_id: session.dependent_id,
        token_type: "Bearer".to_string(),
        expires_in: session.expires_in,
    }))
}

/// Check whether a session token is currently valid
#[utoipa::path(
    post,
    path = "/credentials/introspect",
    request_body = IntrospectRequest,
    responses(
        (status = 200, description = "Token status", body = IntrospectResponse)
    ),
    tag = "Credentials"
)]
pub async fn introspect_session(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<IntrospectRequest>,
) -> Json<IntrospectResponse> {
    Json(state.credentials.introspect(&req.token))
}
