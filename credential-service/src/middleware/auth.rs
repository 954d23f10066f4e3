use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{
    services::{SessionClaims, SessionRole},
    AppState,
};

/// Require a guardian session token on the request.
///
/// Missing or unverifiable tokens are 401; a valid token for any other role
/// is 403.
pub async fn guardian_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state.jwt.validate_session_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected guardian session token");
        AppError::Unauthorized(anyhow::anyhow!("Invalid or expired token"))
    })?;

    if claims.role != SessionRole::Guardian {
        tracing::warn!(subject = %claims.sub, role = ?claims.role, "Non-guardian token on guardian route");
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Guardian session required"
        )));
    }

    // Store claims in request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Claims of the authenticated guardian.
pub struct AuthGuardian(pub SessionClaims);

impl AuthGuardian {
    pub fn guardian_id(&self) -> &str {
        &self.0.sub
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthGuardian
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<SessionClaims>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "Auth claims missing from request extensions"
            ))
        })?;

        Ok(AuthGuardian(claims.clone()))
    }
}
