use actix_web::{middleware::Compress, App, HttpServer};
use actix_cors::Cors;
use utoipa_swagger_ui::SwaggerUi;

mod error;
mod feed;
mod models;
mod openapi;
mod rate_limit;
mod repo;
mod routes;
mod security;

use openapi::ApiDoc;
use rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
#[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
use repo::inmem::InMemRepo;
use routes::{config, AppState};
use security::SecurityHeaders;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Environment variables come from the deployment (shell, systemd,
    // Docker). Load .env automatically only in debug builds.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    validate_env_vars();

    // Structured logging initialisation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping haven server");
    info!(
        "Frontend URL: {}",
        std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:8081".to_string())
    );

    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    let repo = InMemRepo::new();
    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    info!("Using in-memory repository backend");

    #[cfg(feature = "postgres-store")]
    let repo = {
        use sqlx::postgres::PgPoolOptions;
        let db_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres-store");
        let pool = PgPoolOptions::new().max_connections(5).connect_lazy(&db_url)?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Using Postgres repository backend");
        crate::repo::pg::PgRepo::new(pool)
    };

    let rl_enabled = std::env::var("HAVEN_RL_ENABLED")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(true);
    let rate_limiter = RateLimiterFacade::new(
        InMemoryRateLimiter::new(rl_enabled),
        RateLimitConfig::from_env(),
    );
    info!("Rate limiting enabled: {rl_enabled}");

    let openapi = ApiDoc::openapi();
    info!("OpenAPI spec generated");

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                // Expo dev server and web bundle during local development
                .allowed_origin("http://localhost:8081")
                .allowed_origin("http://127.0.0.1:8081")
                .allowed_origin("http://localhost:19006")
                .allowed_origin("http://127.0.0.1:19006")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .supports_credentials()
                .max_age(3600);
            if let Ok(front) = std::env::var("FRONTEND_URL") {
                c = c.allowed_origin(&front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::from_env())
            .wrap(cors)
            .configure(config)
            .service(SwaggerUi::new("/docs").url("/docs/openapi.json", openapi.clone()))
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(repo.clone()),
                rate_limiter: Some(rate_limiter.clone()),
            }))
    })
    .bind(("0.0.0.0", 8000))?;

    info!("Listening on http://0.0.0.0:8000");

    server.run().await?;
    Ok(())
}

/// Fail fast on configuration the selected backend cannot run without.
fn validate_env_vars() {
    if cfg!(feature = "postgres-store") && std::env::var("DATABASE_URL").is_err() {
        eprintln!("Missing required environment variable: DATABASE_URL");
        eprintln!("Set it to the Postgres connection string for the haven database");
        std::process::exit(1);
    }

    if std::env::var("FRONTEND_URL").is_err() {
        eprintln!("Warning: FRONTEND_URL not set; CORS allows local dev origins only");
    }
}
