//! Busline booking server
//!
//! Serves seat booking, cancellation and balance top-ups for bus trips over
//! HTTP, backed by PostgreSQL.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use busline_api::{configure, json_config};
use busline_auth::JwtService;
use busline_core::config::LogConfig;
use busline_core::AppConfig;
use busline_db::{create_pool, run_migrations, PgBookingStore};
use busline_services::{BalanceService, BookingOrchestrator, CancellationFlow, CatalogService};
use std::io;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
fn init_tracing(log: &LogConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "busline_booking={lvl},busline_api={lvl},busline_services={lvl},busline_db={lvl},busline_auth={lvl},actix_web=info,sqlx=warn",
            lvl = log.level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    if log.json {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    io::Error::other(format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().map_err(|e| startup_error("Invalid configuration", e))?;

    init_tracing(&config.log);

    info!(
        "Starting Busline booking server v{}",
        env!("CARGO_PKG_VERSION")
    );

    if config.auth.jwt_secret.len() < 32 {
        warn!("JWT secret is shorter than 32 bytes; use a longer secret in production");
    }
    let jwt_service = Arc::new(JwtService::new(
        &config.auth.jwt_secret,
        config.auth.jwt_expiration_secs,
    ));

    info!("Connecting to database...");
    let pool = create_pool(&config.database.url, Some(config.database.max_connections))
        .await
        .map_err(|e| startup_error("Failed to create database pool", e))?;

    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .map_err(|e| startup_error("Failed to apply migrations", e))?;
    }

    let store = Arc::new(PgBookingStore::new(pool));

    let orchestrator = web::Data::new(BookingOrchestrator::new(store.clone(), &config.booking));
    let cancellation = web::Data::new(CancellationFlow::new(store.clone()));
    let catalog = web::Data::new(CatalogService::new(store.clone()));
    let balance = web::Data::new(BalanceService::new(store, &config.booking));
    let jwt_data = web::Data::new(jwt_service);

    info!(
        allocation = ?config.booking.discount_allocation,
        "Booking services ready"
    );

    let bind_addr = config.server_addr();
    let workers = config.server.workers;
    let cors_origins = config.server.cors_origins.clone();

    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, workers
    );

    HttpServer::new(move || {
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                origin
                    .to_str()
                    .map(|origin| cors_origins_inner.split(',').any(|o| o.trim() == origin))
                    .unwrap_or(false)
            })
            .allowed_methods(vec!["GET", "POST", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
                header::COOKIE,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(orchestrator.clone())
            .app_data(cancellation.clone())
            .app_data(catalog.clone())
            .app_data(balance.clone())
            .app_data(jwt_data.clone())
            .app_data(json_config())
            // Middleware
            .wrap(cors)
            .wrap(middleware::Logger::new("%a \"%r\" %s %b %Dms"))
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::trim())
            .configure(configure::<PgBookingStore>)
            .route(
                "/",
                web::get().to(|| async {
                    HttpResponse::Found()
                        .append_header(("Location", "/api/v1/health"))
                        .finish()
                }),
            )
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await
}
