//! Test helpers for credential-service integration tests.
//!
//! Wires the real router and `CredentialService` around in-memory doubles
//! for the credential store and the account directory.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use credential_service::{
    build_router,
    config::{
        CredentialConfig, Environment, MongoConfig, RateLimitConfig, SecurityConfig,
        SessionConfig, SwaggerConfig, SwaggerMode,
    },
    models::{Dependent, Guardian},
    services::{
        CredentialService, JwtService, MockAccountDirectory, MockCredentialStore, SessionRole,
    },
    utils::{ImageRenderer, PngQrRenderer},
    AppState,
};
use secrecy::Secret;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_SIGNING_SECRET: &str = "integration-test-session-signing-secret";

pub const GUARDIAN_A: &str = "65a1f0c2e4b0a1b2c3d4e5a1";
pub const GUARDIAN_B: &str = "65a1f0c2e4b0a1b2c3d4e5b1";
/// Managed by `GUARDIAN_A`
pub const DEPENDENT_A1: &str = "65a1f0c2e4b0a1b2c3d4e5a2";
/// Managed by `GUARDIAN_A`
pub const DEPENDENT_A2: &str = "65a1f0c2e4b0a1b2c3d4e5a3";
/// Managed by `GUARDIAN_B`
pub const DEPENDENT_B1: &str = "65a1f0c2e4b0a1b2c3d4e5b2";

pub fn test_config() -> CredentialConfig {
    CredentialConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "credential-service-test".to_string(),
        service_version: "0.0.0-test".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        mongodb: MongoConfig {
            uri: Secret::new("mongodb://localhost:27017".to_string()),
            database: "credential_test".to_string(),
        },
        session: SessionConfig {
            signing_secret: Secret::new(TEST_SIGNING_SECRET.to_string()),
            token_expiry_minutes: 60,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
        rate_limit: RateLimitConfig {
            exchange_attempts: 1_000,
            exchange_window_seconds: 60,
            global_ip_limit: 1_000,
            global_ip_window_seconds: 60,
        },
    }
}

pub struct TestApp {
    pub router: Router,
    pub service: CredentialService,
    pub store: Arc<MockCredentialStore>,
    pub directory: Arc<MockAccountDirectory>,
    pub jwt: JwtService,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::spawn_with(test_config(), Arc::new(PngQrRenderer::default()))
    }

    pub fn spawn_with_renderer(renderer: Arc<dyn ImageRenderer>) -> Self {
        Self::spawn_with(test_config(), renderer)
    }

    pub fn spawn_with_config(config: CredentialConfig) -> Self {
        Self::spawn_with(config, Arc::new(PngQrRenderer::default()))
    }

    pub fn spawn_with(config: CredentialConfig, renderer: Arc<dyn ImageRenderer>) -> Self {
        let store = Arc::new(MockCredentialStore::new());
        let directory = Arc::new(MockAccountDirectory::new());
        seed_accounts(&directory);

        let jwt = JwtService::new(&config.session).expect("Failed to create JWT service");
        let service =
            CredentialService::new(store.clone(), directory.clone(), jwt.clone(), renderer);

        let state = AppState::new(config, service.clone(), jwt.clone());
        let router = build_router(state);

        Self {
            router,
            service,
            store,
            directory,
            jwt,
        }
    }

    pub fn guardian_token(&self, guardian_id: &str) -> String {
        self.jwt
            .generate_session_token(guardian_id, None, SessionRole::Guardian)
            .expect("Failed to sign guardian token")
    }

    pub fn dependent_token(&self, dependent_id: &str) -> String {
        self.jwt
            .generate_session_token(dependent_id, None, SessionRole::Dependent)
            .expect("Failed to sign dependent token")
    }

    /// Send one request through the router and return status and JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self
            .send(method, uri, bearer, body.map(|b| b.to_string()), &[])
            .await;
        let status = response.status();
        (status, body_json(response).await)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        raw_body: Option<String>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match raw_body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Issue through the HTTP API as `guardian_id` and return the secret.
    pub async fn issue_secret(&self, guardian_id: &str, dependent_id: &str) -> String {
        let token = self.guardian_token(guardian_id);
        let (status, body) = self
            .request(
                Method::POST,
                &format!("/credentials/dependents/{}/issue", dependent_id),
                Some(&token),
                Some(serde_json::json!({ "returnImage": false })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "issue failed: {}", body);
        body["secret"].as_str().unwrap().to_string()
    }
}

fn seed_accounts(directory: &MockAccountDirectory) {
    directory.insert_guardian(Guardian::new(GUARDIAN_A, [DEPENDENT_A1, DEPENDENT_A2]));
    directory.insert_guardian(Guardian::new(GUARDIAN_B, [DEPENDENT_B1]));
    directory.insert_dependent(Dependent::new(DEPENDENT_A1, "Ada", GUARDIAN_A));
    directory.insert_dependent(Dependent::new(DEPENDENT_A2, "Grace", GUARDIAN_A));
    directory.insert_dependent(Dependent::new(DEPENDENT_B1, "Alan", GUARDIAN_B));
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
