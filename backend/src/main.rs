use std::{net::SocketAddr, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use notes_portal_backend::{
    app::build_router,
    config::Config,
    db::connection::{create_pool, DbPool},
    state::AppState,
};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notes_portal_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load()?;
    tracing::info!(
        bind_address = %config.bind_address,
        jwt_secret = %mask_secret(&config.jwt_secret),
        jwt_expiration_hours = config.jwt_expiration_hours,
        cors_allow_origins = ?config.cors_allow_origins,
        rate_limit_login_enabled = config.rate_limit_login_enabled,
        pin_hash_memory_kib = config.pin_hash_memory_kib,
        pin_hash_iterations = config.pin_hash_iterations,
        "Loaded configuration from environment/.env"
    );

    // Initialize database
    let pool: DbPool = create_pool(
        &config.database_url,
        config.db_max_connections,
        Duration::from_secs(config.request_timeout_seconds.max(1)),
    )
    .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let bind_address = config.bind_address.clone();
    let state = AppState::from_pool(pool, config)?;
    let app = build_router(state);

    // Start server
    let addr: SocketAddr = bind_address.parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
