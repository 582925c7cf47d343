use realvid_auth::config::Config;
use realvid_auth::{create_app, spawn_sweeper, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "realvid_auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(environment = ?config.environment, "configuration loaded");

    let state = Arc::new(AppState::from_config(&config).await?);
    spawn_sweeper(state.clone());

    let app = create_app(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
