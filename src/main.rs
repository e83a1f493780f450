use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use chrono::Utc;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snipster_server::config::{Config, GuestAccount};
use snipster_server::constants::SESSION_PURGE_INTERVAL_SECS;
use snipster_server::db::{self, sessions, users};
use snipster_server::routes::build_router;
use snipster_server::security::{hash_password, verify_password};
use snipster_server::{AppState, Db};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snipster_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Snipster Server...");

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "Environment: {}, Server: {}",
        config.environment,
        config.server_address()
    );

    let db = db::open_database(&config.database_path)?;

    if let Some(guest) = config.guest.clone() {
        provision_guest(db.clone(), guest, config.password_hash_cost).await?;
    }

    spawn_session_purge(db.clone());

    let origins = config
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;

    // Credentialed CORS cannot use wildcards
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    let log_requests = config.log_requests;
    let state = AppState::new(db, config.clone());

    let app = build_router(state).layer(cors);
    let app = if log_requests {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    };

    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn provision_guest(db: Db, guest: GuestAccount, cost: u32) -> anyhow::Result<()> {
    let user = tokio::task::spawn_blocking(move || {
        users::provision_guest(
            &db,
            &guest.email,
            || Ok(hash_password(&guest.password, cost)?),
            |hash| verify_password(&guest.password, hash),
        )
    })
    .await??;

    tracing::info!("Guest account ready: {}", user.username);
    Ok(())
}

/// Drop expired sessions on a fixed interval
fn spawn_session_purge(db: Db) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(SESSION_PURGE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let db = db.clone();
            let result =
                tokio::task::spawn_blocking(move || sessions::purge_expired(&db, Utc::now().timestamp()))
                    .await;
            match result {
                Ok(Ok(0)) => {}
                Ok(Ok(purged)) => tracing::info!("Purged {} expired sessions", purged),
                Ok(Err(e)) => tracing::error!("Session purge failed: {:?}", e),
                Err(e) => tracing::error!("Session purge task failed: {:?}", e),
            }
        }
    });
}
