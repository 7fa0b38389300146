//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request errors are rendered by `auth`.

use auth::{
    AuthAppState, AuthConfig, CurrentUser, InMemoryAuthRepository, PgAuthRepository, auth_router,
    domain::repository::{AccountRepository, SessionRepository},
    require_session,
};
use axum::{Extension, Router, middleware, response::Html, routing::get};
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasks_api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config()?;
    tracing::info!(
        max_failed_attempts = config.max_failed_attempts,
        login_timeout_secs = config.login_timeout.as_secs(),
        "Auth configuration loaded"
    );

    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()?;

    match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;

            tracing::info!("Connected to database");

            // Run migrations
            sqlx::migrate!("../../../database/migrations")
                .run(&pool)
                .await?;

            tracing::info!("Migrations completed");

            let repo = PgAuthRepository::new(pool);

            // Errors here should not prevent server startup
            let idle_before = chrono::Utc::now() - config.session_idle_timeout()?;
            if let Err(e) = repo.cleanup_idle(idle_before).await {
                tracing::warn!(
                    error = %e,
                    "Auth session cleanup failed, continuing anyway"
                );
            }

            serve(addr, repo, config).await
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, accounts and sessions are kept in memory");
            serve(addr, InMemoryAuthRepository::new(), config).await
        }
    }
}

fn load_config() -> anyhow::Result<AuthConfig> {
    if !cfg!(debug_assertions) && env::var("AUTH_SESSION_SECRET").is_err() {
        anyhow::bail!("AUTH_SESSION_SECRET must be set in production");
    }

    let mut config = AuthConfig::from_env()?;

    // Local development runs over plain HTTP
    if cfg!(debug_assertions) && env::var("COOKIE_SECURE").is_err() {
        config.cookie_secure = false;
    }

    Ok(config)
}

async fn serve<R>(addr: SocketAddr, repo: R, config: AuthConfig) -> anyhow::Result<()>
where
    R: AccountRepository + SessionRepository + Clone + Send + Sync + 'static,
{
    let state = AuthAppState::new(repo, config);

    // Task list pages sit behind the session guard
    let protected = Router::new()
        .route("/", get(home))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session::<R>,
        ));

    let app = Router::new()
        .merge(protected)
        .merge(auth_router(state))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// GET /
async fn home(Extension(user): Extension<CurrentUser>) -> Html<String> {
    Html(format!(
        "<!doctype html><title>Todo list</title><h1>{}'s Todo list</h1><a href=\"/logout\">logout</a>",
        escape_html(user.user_name.as_str())
    ))
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
