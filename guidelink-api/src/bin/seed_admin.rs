//! Creates the admin account from `GUIDELINK_ADMIN_EMAIL`, `GUIDELINK_ADMIN_PASSWORD`
//! and `GUIDELINK_ADMIN_NAME`. Running it again leaves an existing account alone.

use diesel::prelude::*;

use guidelink_api::config::{AdminSeedConfig, AppConfig};
use guidelink_api::run_migrations;
use guidelink_api::services::auth_service;

fn main() -> anyhow::Result<()> {
    guidelink_shared::middleware::init_tracing("seed-admin");

    let config = AppConfig::load()?;
    let admin = AdminSeedConfig::load()?;

    let mut conn = PgConnection::establish(&config.database_url)?;
    if config.run_migrations {
        run_migrations(&mut conn)?;
    }

    match auth_service::seed_admin(&mut conn, &admin.email, &admin.password, &admin.name)? {
        Some(user) => tracing::info!(user_id = %user.id, email = %user.email, "admin account created"),
        None => tracing::info!(email = %admin.email, "admin account already exists"),
    }

    Ok(())
}
