use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

/// Fallback signing key for local development. Never accepted in production.
pub const DEV_SESSION_SIGNING_SECRET: &str = "dev-insecure-session-signing-secret-change-me";

/// Minimum signing key length accepted in production (HS256 wants >= 256 bits).
pub const MIN_PROD_SECRET_BYTES: usize = 32;

/// Longest session token validity accepted: one year.
pub const MAX_TOKEN_EXPIRY_MINUTES: i64 = 525_600;

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub mongodb: MongoConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
    pub swagger: SwaggerConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: Secret<String>,
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Symmetric HS256 key shared with the account service.
    pub signing_secret: Secret<String>,
    /// Validity window of session tokens minted on exchange.
    pub token_expiry_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwaggerConfig {
    pub enabled: SwaggerMode,
}

/// Exposure of the interactive docs. `/.well-known/openapi.json` is served in
/// either mode; only `/docs` is gated.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SwaggerMode {
    Public,
    Disabled,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub exchange_attempts: u32,
    pub exchange_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

impl SessionConfig {
    pub fn uses_dev_secret(&self) -> bool {
        self.signing_secret.expose_secret() == DEV_SESSION_SIGNING_SECRET
    }
}

impl CredentialConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = CredentialConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("credential-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            mongodb: MongoConfig {
                uri: Secret::new(get_env("MONGODB_URI", None, is_prod)?),
                database: get_env("MONGODB_DATABASE", Some("credential_db"), is_prod)?,
            },
            session: SessionConfig {
                signing_secret: Secret::new(get_env(
                    "SESSION_SIGNING_SECRET",
                    Some(DEV_SESSION_SIGNING_SECRET),
                    is_prod,
                )?),
                token_expiry_minutes: parse_env(
                    "SESSION_TOKEN_EXPIRY_MINUTES",
                    Some("1440"),
                    is_prod,
                )?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            swagger: SwaggerConfig {
                enabled: get_env("ENABLE_SWAGGER", Some("public"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
            rate_limit: RateLimitConfig {
                exchange_attempts: parse_env("RATE_LIMIT_EXCHANGE_ATTEMPTS", Some("10"), is_prod)?,
                exchange_window_seconds: parse_env(
                    "RATE_LIMIT_EXCHANGE_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?,
                global_ip_limit: parse_env("RATE_LIMIT_GLOBAL_IP_LIMIT", Some("100"), is_prod)?,
                global_ip_window_seconds: parse_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 && self.environment == Environment::Prod {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.session.token_expiry_minutes <= 0
            || self.session.token_expiry_minutes > MAX_TOKEN_EXPIRY_MINUTES
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_TOKEN_EXPIRY_MINUTES must be between 1 and {}",
                MAX_TOKEN_EXPIRY_MINUTES
            )));
        }

        if self.session.signing_secret.expose_secret().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_SIGNING_SECRET must not be empty"
            )));
        }

        if self.environment == Environment::Prod {
            if self.session.uses_dev_secret() {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "SESSION_SIGNING_SECRET is set to the development default in production"
                )));
            }

            if self.session.signing_secret.expose_secret().len() < MIN_PROD_SECRET_BYTES {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "SESSION_SIGNING_SECRET must be at least {} bytes in production",
                    MIN_PROD_SECRET_BYTES
                )));
            }

            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.swagger.enabled == SwaggerMode::Public {
                tracing::warn!("Swagger UI is publicly accessible in production; set ENABLE_SWAGGER=disabled to hide it");
            }
        }

        Ok(())
    }

    /// Whether `/docs` is mounted.
    pub fn swagger_ui_enabled(&self) -> bool {
        self.swagger.enabled == SwaggerMode::Public
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?
        .trim()
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("Invalid {}: {}", key, e)))
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for SwaggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(SwaggerMode::Public),
            "disabled" => Ok(SwaggerMode::Disabled),
            _ => Err(format!("Invalid swagger mode: {}", s)),
        }
    }
}
