use std::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{0} has an invalid value: {1}")]
    Invalid(&'static str, String),

    #[error("email delivery must be configured outside development (set EMAIL_API_KEY and EMAIL_FROM)")]
    EmailRequired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "dev" | "development" | "test" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            other => Err(ConfigError::Invalid("APP_ENV", other.to_string())),
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Transactional email relay (Brevo-compatible JSON API).
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from_email: String,
    pub from_name: Option<String>,
}

/// Environment configuration
/// Loads and validates environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub frontend_url: String,
    pub email: Option<EmailConfig>,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = Environment::parse(&lookup("APP_ENV").unwrap_or_default())?;

        let jwt_secret = non_empty("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let database_url = non_empty("DATABASE_URL");
        if database_url.is_none() && !environment.is_development() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let email = match (non_empty("EMAIL_API_KEY"), non_empty("EMAIL_FROM")) {
            (Some(api_key), Some(from_email)) => Some(EmailConfig {
                api_url: non_empty("EMAIL_API_URL")
                    .unwrap_or_else(|| "https://api.brevo.com/v3/smtp/email".to_string()),
                api_key,
                from_email,
                from_name: non_empty("EMAIL_FROM_NAME"),
            }),
            _ => None,
        };
        if email.is_none() && !environment.is_development() {
            return Err(ConfigError::EmailRequired);
        }

        let port = match non_empty("APP_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid("APP_PORT", raw))?,
            None => 3000,
        };

        Ok(Self {
            environment,
            database_url,
            redis_url: non_empty("REDIS_URL"),
            jwt_secret,
            frontend_url: non_empty("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            email,
            host: non_empty("APP_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }
}
