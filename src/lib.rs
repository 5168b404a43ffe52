pub(crate) mod controllers;
pub(crate) mod core;
pub(crate) mod routes;
pub(crate) mod token;
pub(crate) mod types;
pub(crate) mod utils;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::core::error::ConfigError as Error;
use crate::core::{config::Args, state::AppState};

pub async fn run() -> Result<(), Error> {
    let config = Args::load()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_new(&config.log_level).unwrap_or_default())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.store_timeout())
        .connect(&config.database_url)
        .await
        .map_err(Error::Sql)?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .map_err(Error::DatabaseMigration)?;

    let state = AppState::new(pool, &config)?;

    let app = routes::router::routes(state, config.request_timeout());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .map_err(Error::IO)?;

    tracing::info!("listening on port {}", config.port);

    axum::serve(listener, app).await.map_err(Error::IO)?;

    Ok(())
}
