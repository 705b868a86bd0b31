use actix_web::{web, App, HttpServer, middleware::Logger};
use actix_cors::Cors;
use dotenv::dotenv;
use std::net::TcpListener;
use std::sync::Arc;

use music_app_server::auth_stores::SharedUserStore;
use music_app_server::config::AppSettings;
use music_app_server::db::{create_pool, verify_connection, UserRepository};
use music_app_server::handlers;
use music_app_server::routes;
use music_app_server::services::auth::{JwtManager, SessionService};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Load application settings
    let app_settings = match AppSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load application settings: {}", e);
            log::error!("Cannot start server without valid settings");
            std::process::exit(1);
        }
    };
    log::info!("Loaded settings for {} ({})", app_settings.app.name, app_settings.app.environment);

    let jwt = match JwtManager::new(&app_settings.auth) {
        Ok(jwt) => jwt,
        Err(e) => {
            log::error!("Failed to initialize JWT keys: {}", e);
            log::error!("Cannot start server without working JWT keys");
            std::process::exit(1);
        }
    };
    log::info!(
        "JWT keys initialized successfully (access lifetime {} minutes, refresh lifetime {} days)",
        jwt.access_ttl().num_minutes(),
        jwt.refresh_ttl().num_days()
    );

    // Database connection setup
    let db_pool = match create_pool(&app_settings.database).await {
        Ok(pool) => {
            if let Err(e) = verify_connection(&pool).await {
                log::error!("Database connection verification failed: {}", e);
                log::error!("Cannot start server without a working database connection");
                std::process::exit(1);
            }
            log::info!("Database connection established successfully");
            pool
        }
        Err(e) => {
            log::error!("Failed to create database connection pool: {}", e);
            log::error!("Cannot start server without a working database connection");
            std::process::exit(1);
        }
    };

    let user_store: SharedUserStore = Arc::new(UserRepository::new(db_pool));
    let session_service = web::Data::new(SessionService::new(jwt.clone(), user_store.clone()));

    log::info!(
        "Role policy: /api/admin re-reads roles from the store; /api/me trusts token claims (max staleness {} minutes)",
        jwt.access_ttl().num_minutes()
    );

    let host = app_settings.server.host.clone();
    let port = app_settings.server.port;
    log::info!("Starting server at http://{}:{}", host, port);

    let listener = TcpListener::bind(format!("{}:{}", host, port))?;

    HttpServer::new(move || {
        // Configure CORS using actix-cors
        let mut cors = Cors::default();
        if app_settings.server.cors_origins.iter().any(|o| o == "*") {
            cors = cors.allow_any_origin();
        } else {
            for origin in &app_settings.server.cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(routes::json_config())
            .app_data(session_service.clone())
            .app_data(web::Data::from(user_store.clone()))
            // Health check without auth
            .service(
                web::resource("/health")
                    .route(web::get().to(handlers::health::health_check))
            )
            // Public auth routes
            .service(
                web::scope("/auth")
                    .configure(routes::configure_public_auth_routes)
            )
            // Protected API routes
            .configure(routes::configure_api_routes(jwt.clone(), user_store.clone()))
    })
    .listen(listener)?
    .run()
    .await
}
