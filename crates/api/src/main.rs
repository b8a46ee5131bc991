mod config;
mod error;
mod handlers;
mod middleware;
mod models;
mod repos;
mod reset_session;
mod seed;
mod services;
mod state;
mod stores;
#[cfg(test)]
mod test_utils;
mod trending;
mod view_ledger;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{self, HeaderValue, Method, header},
};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    config::Config,
    repos::{PgAdminRepo, PgPostRepo, PgStatusRepo, PgViewRepo, Repos},
    seed::SeedAdmin,
    services::{EmailSenderImpl, EmailTemplate, JwtAuthService},
    state::AppState,
    stores::{RedisRateLimiter, RedisStatusStore, Stores},
};

#[derive(Parser)]
#[command(name = "newsdesk-api")]
#[command(about = "Newsdesk API server")]
struct Args {
    /// Run database migrations and exit
    #[arg(long)]
    migrate: bool,

    /// Create the initial admin from NEWSDESK_SEED_ADMIN_* and exit
    #[arg(long)]
    seed_admin: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let args = Args::parse();
    let config = envy::prefixed("NEWSDESK_").from_env::<Config>()?;

    // Initialize Sentry for error tracking (must be done early, guard must stay alive)
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.env.clone().into()),
                ..Default::default()
            },
        ))
    });

    // Set up tracing: JSON in production, human-readable otherwise
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    let database = PgPoolOptions::new()
        .max_connections(25)
        .connect(&config.database_url)
        .await?;

    // Run migrations via init container only (--migrate flag)
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&database).await?;
        tracing::info!("Migrations complete");
        return Ok(());
    }

    let auth = Arc::new(JwtAuthService::new(&config.jwt_secret, config.token_ttl_secs));
    let admins = Arc::new(PgAdminRepo::new(database.clone()));

    if args.seed_admin {
        let seed = envy::prefixed("NEWSDESK_SEED_ADMIN_")
            .from_env::<SeedAdmin>()
            .context("NEWSDESK_SEED_ADMIN_EMAIL and NEWSDESK_SEED_ADMIN_PASSWORD are required")?;
        seed::seed_admin(admins.as_ref(), auth.as_ref(), seed).await?;
        return Ok(());
    }

    let redis = redis::Client::open(config.redis_url.as_str())?;
    let email = EmailSenderImpl::new(
        config.resend_api_key.clone(),
        config.smtp_url.clone(),
        EmailTemplate {
            from: config.email_from.clone(),
            app_name: config.app_name.clone(),
        },
    )?;

    let repos = Repos {
        admins,
        posts: Arc::new(PgPostRepo::new(database.clone())),
        views: Arc::new(PgViewRepo::new(database.clone())),
        status: Arc::new(PgStatusRepo::new(database)),
    };

    let stores = Stores {
        rate_limiter: Arc::new(RedisRateLimiter::new(redis.clone())),
        status: Arc::new(RedisStatusStore::new(redis)),
    };

    let purge = view_ledger::spawn_purge_task(repos.views.clone());

    let state = AppState {
        config: config.clone(),
        repos,
        stores,
        auth,
        email: Arc::new(email),
    };

    // Request ID header name
    let x_request_id = http::HeaderName::from_static("x-request-id");

    let app = Router::new()
        .nest("/health", handlers::health::router())
        .nest("/admin", handlers::admin::router())
        .nest("/post", handlers::posts::router(state.clone()))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            error::internal_details,
        ))
        .with_state(state)
        // Request ID: generate UUID, include in logs, return in response
        .layer(PropagateRequestIdLayer::new(x_request_id.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &http::Request<axum::body::Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            },
        ))
        .layer(SetRequestIdLayer::new(x_request_id, MakeRequestUuid))
        .layer(cors_layer(&config)?)
        .layer(RequestBodyLimitLayer::new(1024 * 1024)); // 1MB limit

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    // Peer addresses key the rate limits and feed the view ledger when no
    // proxy headers are present.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    purge.abort();
    tracing::info!("Shutdown complete");

    Ok(())
}

/// Credentialed CORS for the configured browser origin; no cross-origin
/// access otherwise.
fn cors_layer(config: &Config) -> Result<CorsLayer> {
    let Some(origin) = config.cors_origin.as_deref().filter(|o| !o.is_empty()) else {
        return Ok(CorsLayer::new());
    };

    Ok(CorsLayer::new()
        .allow_origin(origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }
}
