use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use diesel::pg::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use guidelink_shared::clients::db::DbPool;
use guidelink_shared::middleware::metrics_middleware;
use guidelink_shared::types::auth::JwtSecret;

pub mod config;
pub mod domain;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;

use config::AppConfig;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub jwt: JwtSecret,
    pub metrics: PrometheusHandle,
}

impl AppState {
    pub fn new(db: DbPool, config: AppConfig, metrics: PrometheusHandle) -> Self {
        let jwt = JwtSecret(config.jwt_secret.clone());
        Self { db, config, jwt, metrics }
    }
}

impl AsRef<JwtSecret> for AppState {
    fn as_ref(&self) -> &JwtSecret {
        &self.jwt
    }
}

pub fn run_migrations(conn: &mut PgConnection) -> anyhow::Result<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("failed to run migrations: {e}"))?;
    tracing::info!(count = applied.len(), "database migrations applied");
    Ok(())
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        // Auth
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/me", get(routes::auth::me).put(routes::auth::update_me))
        // Requests and applications
        .route(
            "/requests",
            get(routes::requests::list_my_requests).post(routes::requests::create_request),
        )
        .route("/requests/open", get(routes::requests::list_open_requests))
        .route("/requests/:id", get(routes::requests::get_request))
        .route("/requests/:id/cancel", post(routes::requests::cancel_request))
        .route("/requests/:id/apply", post(routes::requests::apply))
        .route("/requests/:id/applicants", get(routes::requests::list_applicants))
        .route("/requests/:id/select-guide", post(routes::requests::select_guide))
        // Matchings
        .route("/matchings", get(routes::matchings::list_my_matchings))
        .route("/matchings/:id", get(routes::matchings::get_matching))
        .route("/matchings/:id/start", post(routes::matchings::start_matching))
        // Chat
        .route("/chat/unread-count", get(routes::chat::unread_count))
        .route(
            "/chat/:matching_id/messages",
            get(routes::chat::list_messages).post(routes::chat::send_message),
        )
        // Reports
        .route(
            "/reports",
            get(routes::reports::list_my_reports).post(routes::reports::create_report),
        )
        .route("/reports/usage-stats", get(routes::reports::usage_stats))
        .route("/reports/guide-stats", get(routes::reports::guide_stats))
        .route(
            "/reports/:id",
            get(routes::reports::get_report).put(routes::reports::update_report),
        )
        .route("/reports/:id/submit", post(routes::reports::submit_report))
        // Announcements
        .route("/announcements", get(routes::announcements::list_announcements))
        .route("/announcements/unread", get(routes::announcements::list_unread))
        .route("/announcements/:id/read", post(routes::announcements::mark_read))
        // Notifications
        .route("/notifications", get(routes::notifications::list_notifications))
        .route("/notifications/unread-count", get(routes::notifications::unread_count))
        .route("/notifications/mark-all-read", post(routes::notifications::mark_all_read))
        .route("/notifications/:id/read", post(routes::notifications::mark_read))
        // Dashboard
        .route("/dashboard", get(routes::dashboard::dashboard))
        // Admin
        .route("/admin/users", get(routes::admin::list_users))
        .route("/admin/users/:id/approve", post(routes::admin::approve_user))
        .route("/admin/reports", get(routes::admin::list_reports))
        .route("/admin/reports/:id/approve", post(routes::admin::approve_report))
        .route(
            "/admin/reports/:id/request-revision",
            post(routes::admin::request_revision),
        )
        .route(
            "/admin/applications/:id/approve",
            post(routes::admin::approve_selection),
        )
        .route(
            "/admin/applications/:id/reject",
            post(routes::admin::reject_selection),
        )
        .route(
            "/admin/announcements",
            get(routes::admin::list_announcements).post(routes::admin::create_announcement),
        )
        .route(
            "/admin/announcements/:id",
            put(routes::admin::update_announcement).delete(routes::admin::delete_announcement),
        );

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .nest("/api", api)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
