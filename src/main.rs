mod admin;
mod catalog;
mod config;
mod db;
mod entities;
mod error;
mod models;
mod routes;
mod templates;

use std::{net::SocketAddr, sync::Arc};

use tower_http::trace::TraceLayer;

use crate::{admin::AdminSite, catalog::Catalog, config::Config};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Catalog,
    pub admin: Arc<AdminSite>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,movies=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Arc::new(Config::from_env()?);

    let db = db::connect_and_migrate(&config.database_url, config.database_max_connections).await?;
    let admin = Arc::new(AdminSite::from_config(&config));
    tracing::info!(models = admin.models().count(), "admin site ready");

    let state = Arc::new(AppState { config: config.clone(), catalog: Catalog::new(db), admin });

    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
