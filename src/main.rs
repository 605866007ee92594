// src/main.rs
use actix_cors::Cors;
use actix_files::Files;
use actix_web::http::header;
use actix_web::middleware::{Compress, DefaultHeaders, Logger};
use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::Context;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Module declarations
mod booking_handlers;
mod config;
mod db;
mod error;
mod handlers;
mod hostel_handlers;
mod ids;
mod models;
mod payment_handlers;
mod room_handlers;
mod student_handlers;
mod visitor_handlers;

use config::{load_config, Config};

use handlers::{get_dashboard_stats, get_recent_activity, get_system_overview, ping};

use student_handlers::{
    create_student, delete_student, get_all_students, get_student, get_student_stats,
    update_student,
};

use room_handlers::{
    create_room, delete_room, get_all_rooms, get_room, get_room_stats, update_room,
};

use hostel_handlers::{
    create_hostel, delete_hostel, get_all_hostels, get_hostel, get_hostel_stats, update_hostel,
};

use booking_handlers::{
    cancel_booking, confirm_booking, create_booking, delete_booking, get_all_bookings,
    get_booking, get_booking_stats, update_booking,
};

use payment_handlers::{
    create_payment, delete_payment, get_all_payments, get_payment, get_payment_stats,
    mark_payment_paid, update_payment,
};

use visitor_handlers::{
    check_in_visitor, check_out_visitor, delete_visitor, get_all_visitors, get_visitor,
    get_visitor_stats,
};

pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Config,
}

// ==================== MAIN ====================

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    setup_logging(&config)?;
    config.print_startup_info();

    // Setup database
    setup_database(&config.database.url).await?;
    let pool = create_database_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    if config.database.seed_on_startup && !config.is_production() {
        db::seed_database(&pool).await?;
    }

    let app_state = Arc::new(AppState {
        db_pool: pool.clone(),
        config: config.clone(),
    });

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server at http://{}", bind_address);

    let workers = config.server.workers;

    let mut server = HttpServer::new(move || {
        let cors = setup_cors(&app_state.config.security.allowed_origins);
        let security_headers = setup_security_headers(&app_state.config.security);
        let static_dir = app_state.config.server.static_dir.clone();

        App::new()
            .wrap(cors)
            .wrap(security_headers)
            .wrap(Logger::default())
            .wrap(Compress::default())
            .app_data(web::Data::new(app_state.clone()))
            // Health check (no JSON envelope)
            .route("/health", web::get().to(|| async { HttpResponse::Ok().body("OK") }))
            .service(
                web::scope("/api")
                    .route("/ping", web::get().to(ping))
                    // Dashboard
                    .service(
                        web::scope("/dashboard")
                            .route("/stats", web::get().to(get_dashboard_stats))
                            .route("/overview", web::get().to(get_system_overview))
                            .route("/activity", web::get().to(get_recent_activity)),
                    )
                    // Students
                    .service(
                        web::scope("/students")
                            .route("", web::get().to(get_all_students))
                            .route("", web::post().to(create_student))
                            .route("/stats", web::get().to(get_student_stats))
                            .route("/{id}", web::get().to(get_student))
                            .route("/{id}", web::put().to(update_student))
                            .route("/{id}", web::delete().to(delete_student)),
                    )
                    // Rooms
                    .service(
                        web::scope("/rooms")
                            .route("", web::get().to(get_all_rooms))
                            .route("", web::post().to(create_room))
                            .route("/stats", web::get().to(get_room_stats))
                            .route("/{id}", web::get().to(get_room))
                            .route("/{id}", web::put().to(update_room))
                            .route("/{id}", web::delete().to(delete_room)),
                    )
                    // Hostels
                    .service(
                        web::scope("/hostels")
                            .route("", web::get().to(get_all_hostels))
                            .route("", web::post().to(create_hostel))
                            .route("/stats", web::get().to(get_hostel_stats))
                            .route("/{id}", web::get().to(get_hostel))
                            .route("/{id}", web::put().to(update_hostel))
                            .route("/{id}", web::delete().to(delete_hostel)),
                    )
                    // Bookings
                    .service(
                        web::scope("/bookings")
                            .route("", web::get().to(get_all_bookings))
                            .route("", web::post().to(create_booking))
                            .route("/stats", web::get().to(get_booking_stats))
                            .route("/{id}", web::get().to(get_booking))
                            .route("/{id}", web::put().to(update_booking))
                            .route("/{id}/confirm", web::put().to(confirm_booking))
                            .route("/{id}/cancel", web::put().to(cancel_booking))
                            .route("/{id}", web::delete().to(delete_booking)),
                    )
                    // Visitors
                    .service(
                        web::scope("/visitors")
                            .route("", web::get().to(get_all_visitors))
                            .route("/stats", web::get().to(get_visitor_stats))
                            .route("/checkin", web::post().to(check_in_visitor))
                            .route("/{id}", web::get().to(get_visitor))
                            .route("/{id}/checkout", web::put().to(check_out_visitor))
                            .route("/{id}", web::delete().to(delete_visitor)),
                    )
                    // Payments
                    .service(
                        web::scope("/payments")
                            .route("", web::get().to(get_all_payments))
                            .route("", web::post().to(create_payment))
                            .route("/stats", web::get().to(get_payment_stats))
                            .route("/{id}", web::get().to(get_payment))
                            .route("/{id}", web::put().to(update_payment))
                            .route("/{id}/paid", web::put().to(mark_payment_paid))
                            .route("/{id}", web::delete().to(delete_payment)),
                    ),
            )
            // Admin dashboard SPA
            .service(Files::new("/", static_dir).index_file("index.html"))
    });

    if let Some(workers) = workers {
        server = server.workers(workers);
    }

    server
        .bind(&bind_address)?
        .run()
        .await
        .context("Server failed to run")?;

    Ok(())
}

// ==================== HELPER FUNCTIONS ====================

fn setup_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::USER_AGENT,
        ])
        .expose_headers(vec![header::CONTENT_LENGTH])
        .max_age(3600);

    if allowed_origins.contains(&"*".to_string()) {
        // Config validation already rejects the wildcard in production
        log::warn!("⚠️  Using wildcard CORS (*) in development mode");
        cors = cors.allow_any_origin().allow_any_header().allow_any_method();
    } else {
        for origin in allowed_origins {
            if origin.is_empty() {
                continue;
            }
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

fn setup_security_headers(config: &crate::config::SecurityConfig) -> DefaultHeaders {
    let mut headers = DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"));

    if config.require_https {
        headers = headers.add((
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains; preload",
        ));
    }

    headers
}

async fn setup_database(database_url: &str) -> anyhow::Result<()> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        log::info!("Creating database: {}", database_url);
        Sqlite::create_database(database_url).await?;
    }
    Ok(())
}

async fn create_database_pool(
    db_config: &crate::config::DatabaseConfig,
) -> anyhow::Result<SqlitePool> {
    // foreign_keys is per-connection in SQLite, so it has to be part of the
    // connect options rather than a one-off PRAGMA
    let options = SqliteConnectOptions::from_str(&db_config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(db_config.max_connections)
        .min_connections(db_config.min_connections)
        .acquire_timeout(Duration::from_secs(db_config.connect_timeout))
        .idle_timeout(Duration::from_secs(db_config.idle_timeout))
        .connect_with(options)
        .await?;

    Ok(pool)
}
