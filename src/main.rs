//! League Service Server
//!
//! Runs the full HTTP API: accounts, organizations and their sports data, and
//! the AI import endpoints. Configuration comes from the environment (and a
//! `.env` file when present).

use axum::{extract::DefaultBodyLimit, http::HeaderValue, middleware::from_fn};
use dotenv::dotenv;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use league_service::{
    api::{security_headers, AppState, RouterBuilder},
    config::{AppConfig, ServerConfig},
    database::{run_migrations, DatabaseConfig},
};

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        log::warn!("CORS allows any origin");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    log::info!("Starting League Service v{}", league_service::VERSION);

    let config = AppConfig::from_env()?;
    config.validate()?;
    log::info!("Configuration loaded and validated");

    let database_pool = DatabaseConfig::from(&config.database).create_pool().await?;

    log::info!("Running database migrations...");
    run_migrations(&database_pool).await?;
    log::info!("Database migrations completed");

    tokio::fs::create_dir_all(&config.import.upload_dir).await?;

    let app_state = AppState::new(database_pool, &config)?;

    match &config.vision {
        Some(vision) => log::info!("Direct import enabled (model {})", vision.model),
        None => log::warn!("VISION_API_KEY not set; direct import is disabled"),
    }
    match &config.import.webhook_url {
        Some(url) => log::info!(
            "Webhook import enabled ({}), callbacks expected at {}",
            url,
            config.import.callback_url()
        ),
        None => log::warn!("IMPORT_WEBHOOK_URL not set; webhook import is disabled"),
    }

    let router = RouterBuilder::with_all_routes()
        .with_auth(app_state.jwt_service.clone())
        .build();

    let app = router.with_state(app_state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config.server))
            .layer(from_fn(security_headers))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.server.max_request_size))
            .into_inner(),
    );

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("League Service listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
