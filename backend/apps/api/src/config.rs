//! Application configuration
//!
//! Read once from the environment at startup, then passed down explicitly.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use auth::{AuthConfig, BootstrapAdmin};
use platform::email::EmailConfig;
use platform::password::{MAX_COST, MIN_COST};
use platform::rate_limit::RateLimitConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },

    #[error("BOOTSTRAP_SUPERADMIN_* requires username, email and password together")]
    PartialBootstrap,
}

/// Log output format (`LOG_FORMAT`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub auth: AuthConfig,
    pub email: Option<EmailConfig>,
    pub rate_limit: RateLimitConfig,
    pub cors_origins: Vec<String>,
    pub host: IpAddr,
    pub port: u16,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
    pub environment: String,
    pub startup_fail_fast: bool,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) over an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = get("SECRET_KEY").ok_or(ConfigError::Missing("SECRET_KEY"))?;

        let defaults = AuthConfig::default();
        let bcrypt_cost = parse_or(&get, "BCRYPT_COST", defaults.bcrypt_cost)?;
        if !(MIN_COST..=MAX_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                name: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        let auth = AuthConfig {
            jwt_secret,
            access_token_ttl: chrono::Duration::minutes(parse_or(
                &get,
                "ACCESS_TOKEN_EXPIRE_MINUTES",
                15,
            )?),
            refresh_token_ttl: chrono::Duration::days(parse_or(
                &get,
                "REFRESH_TOKEN_EXPIRE_DAYS",
                7,
            )?),
            reset_token_ttl: chrono::Duration::minutes(parse_or(
                &get,
                "PASSWORD_RESET_TOKEN_EXPIRE_MINUTES",
                60,
            )?),
            bcrypt_cost,
            frontend_url: get("FRONTEND_URL").unwrap_or(defaults.frontend_url),
            project_name: get("PROJECT_NAME").unwrap_or(defaults.project_name),
        };

        let rate_limit = RateLimitConfig::new(
            parse_or(&get, "RATE_LIMIT_REQUESTS", 200)?,
            parse_or(&get, "RATE_LIMIT_WINDOW_SECONDS", 3600)?,
        );

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let log_format = match get("LOG_FORMAT") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                name: "LOG_FORMAT",
                value,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            database_url,
            auth,
            email: EmailConfig::from_lookup(&get),
            rate_limit,
            cors_origins,
            host: parse_or(&get, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&get, "PORT", 8000)?,
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECONDS", 30)?),
            log_format,
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            startup_fail_fast: parse_bool(&get, "STARTUP_FAIL_FAST")?,
            bootstrap_admin: bootstrap_admin(&get)?,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn project_name(&self) -> &str {
        &self.auth.project_name
    }

    pub fn email_configured(&self) -> bool {
        self.email.is_some()
    }
}

fn parse_or<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn parse_bool(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<bool, ConfigError> {
    match get(name) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        },
        None => Ok(false),
    }
}

fn bootstrap_admin(
    get: &impl Fn(&str) -> Option<String>,
) -> Result<Option<BootstrapAdmin>, ConfigError> {
    match (
        get("BOOTSTRAP_SUPERADMIN_USERNAME"),
        get("BOOTSTRAP_SUPERADMIN_EMAIL"),
        get("BOOTSTRAP_SUPERADMIN_PASSWORD"),
    ) {
        (Some(username), Some(email), Some(password)) => Ok(Some(BootstrapAdmin {
            username,
            email,
            password,
        })),
        (None, None, None) => Ok(None),
        _ => Err(ConfigError::PartialBootstrap),
    }
}
