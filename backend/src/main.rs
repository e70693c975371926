use league_server::{api, auth, config, create_app, db, league};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("league_server=info,tower_http=info")),
        )
        .init();

    let config = config::Config::from_env()?;
    tracing::info!("Starting league server on {}", config.server_addr());

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database connected");

    db::run_migrations(&pool).await?;

    if let Some(admin) = &config.bootstrap_admin {
        api::auth::ensure_admin(&pool, &admin.username, &admin.password, config.bcrypt_cost)
            .await?;
    }

    let state = Arc::new(api::AppState {
        pool: pool.clone(),
        jwt_manager: Arc::new(auth::JwtManager::new(
            config.jwt_secret.clone(),
            config.token_ttl_hours,
        )),
        league: Arc::new(league::LeagueManager::new(pool)),
        bcrypt_cost: config.bcrypt_cost,
    });

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr()).await?;
    tracing::info!("Server listening on {}", config.server_addr());

    axum::serve(listener, app).await?;

    Ok(())
}
