pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Json, Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{openapi::security::SecurityScheme, Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CredentialConfig;
use crate::services::{CredentialService, JwtService};

pub use startup::Application;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::health::credentials_health,
        handlers::credentials::issue_credential,
        handlers::credentials::list_credentials,
        handlers::credentials::revoke_credentials,
        handlers::credentials::exchange_credential,
        handlers::credentials::introspect_session,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::credential::IssueCredentialRequest,
            dtos::credential::IssueCredentialResponse,
            dtos::credential::ExchangeRequest,
            dtos::credential::ExchangeResponse,
            dtos::credential::RevokeCredentialsResponse,
            dtos::credential::CredentialSummary,
            dtos::credential::ListCredentialsResponse,
            dtos::credential::IntrospectRequest,
            dtos::credential::IntrospectResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Credentials", description = "QR login credential issuance, exchange and revocation"),
        (name = "Observability", description = "Health checks")
    ),
    info(
        title = "Credential Service API",
        description = "Passwordless QR login for guardian-managed dependents"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: CredentialConfig,
    pub credentials: CredentialService,
    pub jwt: JwtService,
    pub exchange_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire state around an already-built credential service; rate limiters
    /// come from `config.rate_limit`.
    pub fn new(config: CredentialConfig, credentials: CredentialService, jwt: JwtService) -> Self {
        let exchange_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.exchange_attempts,
            config.rate_limit.exchange_window_seconds,
        );
        let ip_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.global_ip_limit,
            config.rate_limit.global_ip_window_seconds,
        );

        Self {
            config,
            credentials,
            jwt,
            exchange_rate_limiter,
            ip_rate_limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    // Exchange is unauthenticated, so brute force is bounded per IP
    let exchange_route = Router::new()
        .route(
            "/credentials/exchange",
            post(handlers::credentials::exchange_credential),
        )
        .layer(from_fn_with_state(
            state.exchange_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let guardian_routes = Router::new()
        .route(
            "/credentials/dependents/:dependent_id/issue",
            post(handlers::credentials::issue_credential),
        )
        .route(
            "/credentials/dependents/:dependent_id",
            get(handlers::credentials::list_credentials)
                .delete(handlers::credentials::revoke_credentials),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::guardian_auth_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route(
            "/credentials/health",
            get(handlers::health::credentials_health),
        );

    if state.config.swagger_ui_enabled() {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        // The OpenAPI document stays available for programmatic clients
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        );
    }

    let cors = cors_layer(&state.config.security.allowed_origins);
    let ip_limiter = state.ip_rate_limiter.clone();

    app.route(
        "/credentials/introspect",
        post(handlers::credentials::introspect_session),
    )
    .merge(exchange_route)
    .merge(guardian_routes)
    .with_state(state)
    // Global IP rate limiting
    .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
    .layer(from_fn(metrics_middleware))
    .layer(
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");

            tracing::info_span!(
                "http_request",
                request_id = %request_id,
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        }),
    )
    .layer(from_fn(request_id_middleware))
    .layer(from_fn(security_headers_middleware))
    .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ]);

    // Only reachable outside production; config validation refuses it there
    if allowed_origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", origin, e);
                None
            }
        })
        .collect();

    layer.allow_origin(origins)
}
