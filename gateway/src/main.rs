use std::net::SocketAddr;

use anyhow::Context;
use axum::{extract::DefaultBodyLimit, Router};
use dotenvy::dotenv;
use sea_orm::{ConnectOptions, Database};
use tracing::info;
use tracing_subscriber::EnvFilter;

use smafolio_core::{ensure_schema, spawn_token_janitor, AppState, JwtCfg, Settings};
use smafolio_portfolios::export::fonts::FontBook;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();

    let settings = Settings::from_env()?;
    let jwt_cfg = JwtCfg::from_env();
    // fail at startup rather than on the first export
    FontBook::load(&settings.export_fonts)
        .await
        .context("EXPORT_FONTS")?;
    info!(fallbacks = settings.export_fonts.len(), "export fonts ok");

    let mut opts = ConnectOptions::new(settings.database_url.clone());
    opts.sqlx_logging(false);
    let db = Database::connect(opts).await?;
    ensure_schema(&db).await?;

    let port = settings.port;
    let body_limit = settings.max_upload_bytes;
    if settings.debug {
        info!("DEBUG is on; do not run like this in production");
    }
    let state = AppState::new(db, settings, jwt_cfg);
    spawn_token_janitor(state.clone());

    let app = Router::new()
        .merge(smafolio_core::urls::router())
        .merge(smafolio_portfolios::router())
        // single-segment catch-all goes last
        .merge(smafolio_portfolios::public_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("listening on http://{}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
