pub mod config;
pub mod modules;
pub mod services;

use axum::{http::StatusCode, middleware, routing::get, Json, Router};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

use config::{Config, ConfigError};
use modules::auth::{
    auth_routes, crud::UserCrud, interface::UserRepository, memory::InMemoryUserRepository,
    schema::ErrorResponse, AuthService, CredentialStore,
};
use modules::metrics::metrics_routes;
use services::csrf::{CsrfGuard, CsrfTokenStore, MemoryCsrfStore};
use services::email::{EmailSender, HttpEmailSender, LogEmailSender, Mailer};
use services::gatekeeper::gatekeeper;
use services::jwt::JwtService;
use services::metrics::{metrics_middleware, MetricsRegistry};
use services::rate_limit::{MemoryRateLimitStore, RateLimitStore, RateLimiters};
use services::redis_cache::{RedisService, StoreError};
use services::security::security_headers;

const MAX_BODY_BYTES: usize = 100 * 1024;
const SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Database unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Shared cache unavailable: {0}")]
    Cache(#[from] StoreError),

    #[error("Metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Which storage each concern landed on, reported by `/health`.
#[derive(Debug, Clone, Copy)]
pub struct Backends {
    pub users: &'static str,
    pub cache: &'static str,
}

pub struct AppState {
    pub auth: AuthService,
    pub jwt_service: Arc<JwtService>,
    pub csrf: CsrfGuard,
    pub rate_limiters: RateLimiters,
    pub metrics: Arc<MetricsRegistry>,
    pub backends: Backends,
}

/// Storage and delivery backends the state is assembled from.
pub struct Components {
    pub users: Arc<dyn UserRepository>,
    pub csrf_store: Arc<dyn CsrfTokenStore>,
    pub rate_limit_store: Arc<dyn RateLimitStore>,
    pub email_sender: Arc<dyn EmailSender>,
    pub backends: Backends,
}

impl Components {
    /// Process-local stores and log-only email.
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            csrf_store: Arc::new(MemoryCsrfStore::new()),
            rate_limit_store: Arc::new(MemoryRateLimitStore::new()),
            email_sender: Arc::new(LogEmailSender),
            backends: Backends {
                users: "memory",
                cache: "memory",
            },
        }
    }
}

impl AppState {
    pub fn new(
        components: Components,
        jwt_service: JwtService,
        frontend_url: &str,
    ) -> Result<Self, StartupError> {
        let jwt_service = Arc::new(jwt_service);
        let metrics = MetricsRegistry::new()?;
        let mailer = Mailer::new(components.email_sender, frontend_url);
        let auth = AuthService::new(
            CredentialStore::new(components.users),
            jwt_service.clone(),
            mailer,
            metrics.clone(),
        );

        Ok(Self {
            auth,
            jwt_service,
            csrf: CsrfGuard::new(components.csrf_store),
            rate_limiters: RateLimiters::new(components.rate_limit_store),
            metrics,
            backends: components.backends,
        })
    }

    pub fn with_rate_limiters(mut self, rate_limiters: RateLimiters) -> Self {
        self.rate_limiters = rate_limiters;
        self
    }

    /// Connects whatever the configuration names and falls back to
    /// in-memory stores for the rest.
    pub async fn from_config(config: &Config) -> Result<Self, StartupError> {
        let jwt_service = JwtService::new(&config.jwt_secret)?;
        let mut components = Components::in_memory();

        match &config.database_url {
            Some(url) => {
                let pool = crate::config::init_db(url).await?;
                tracing::info!("Connected to MySQL");
                components.users = Arc::new(UserCrud::new(pool));
                components.backends.users = "mysql";
            }
            None => tracing::warn!("DATABASE_URL not set; users are kept in memory"),
        }

        if let Some(url) = &config.redis_url {
            let redis = RedisService::connect(url).await?;
            redis.ping().await?;
            tracing::info!("Connected to Redis");
            let redis = Arc::new(redis);
            components.csrf_store = redis.clone();
            components.rate_limit_store = redis;
            components.backends.cache = "redis";
        }

        match &config.email {
            Some(email) => components.email_sender = Arc::new(HttpEmailSender::new(email.clone())),
            None => tracing::warn!("email relay not configured; emails are logged only"),
        }

        Self::new(components, jwt_service, &config.frontend_url)
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .fallback(api_not_found)
        .layer(middleware::from_fn_with_state(state.clone(), gatekeeper));

    Router::new()
        .route("/", get(root))
        .merge(metrics_routes())
        .nest("/api", api)
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics_middleware,
        ))
        .layer(middleware::from_fn(security_headers))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Periodically drops expired CSRF tokens, rate-limit windows and user
/// token fields.
pub fn spawn_sweeper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let csrf = state.csrf.sweep().await;
            let windows = state.rate_limiters.sweep().await;
            let tokens = match state.auth.clear_expired_tokens().await {
                Ok(cleared) => cleared,
                Err(e) => {
                    tracing::warn!(error = %e, "expired token sweep failed");
                    0
                }
            };
            tracing::debug!(csrf, windows, tokens, "periodic sweep finished");
        }
    })
}

async fn root() -> &'static str {
    "RealVid Auth API"
}

async fn api_not_found() -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Route not found")))
}
