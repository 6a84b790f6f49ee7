use std::sync::Arc;

use guidelink_api::config::AppConfig;
use guidelink_api::{build_router, run_migrations, AppState};
use guidelink_shared::clients::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    guidelink_shared::middleware::init_tracing("guidelink-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let pool = db::create_pool(&config.database_url, config.db_pool_size)?;
    if config.run_migrations {
        let mut conn = pool.get()?;
        run_migrations(&mut conn)?;
    }

    let metrics = guidelink_shared::middleware::init_metrics()?;
    let state = Arc::new(AppState::new(pool, config, metrics));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "guidelink-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
