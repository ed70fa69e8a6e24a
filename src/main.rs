use actix_web::{
    middleware::{Logger, DefaultHeaders},
    web, App, HttpServer,
    http::header::{CONTENT_TYPE, AUTHORIZATION},
};
use actix_web_httpauth::middleware::HttpAuthentication;
use actix_cors::Cors;
use anyhow::Context;
use rand::{thread_rng, Rng, distributions::Alphanumeric};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod auth_handlers;
mod config;
mod daily_handlers;
mod db;
mod error;
mod models;
mod monitoring;
mod params;
mod pending_handlers;
pub mod query_builders;
mod report_handlers;
pub mod repositories;
mod stats;
mod token_revocation;

use auth::{AuthService, UserCredential, jwt_middleware};
use auth_handlers::{login, logout, me};
use config::{Config, load_config};
use daily_handlers::{get_daily_counts, get_period_count};
use error::ApiError;
use monitoring::{Metrics, RequestLogger, start_maintenance_tasks};
use pending_handlers::*;
use report_handlers::*;
use repositories::{AssetStore, SqliteAssetStore};

const DEFAULT_ADMIN_USERNAME: &str = "admin";

pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Config,
    pub assets: Arc<dyn AssetStore>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (this calls load_env_file internally)
    let config = load_config()?;

    setup_logging(&config)?;
    config.print_startup_info();

    if config.is_production() {
        validate_production_config(&config)?;
    }

    let pool = create_database_pool(&config.database).await?;

    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let auth_service = Arc::new(AuthService::new(
        &config.auth.jwt_secret,
        config.auth.token_expiration_hours,
        config.auth.bcrypt_cost,
    ));

    create_default_admin_if_needed(&pool, &auth_service).await?;

    let app_state = Arc::new(AppState {
        db_pool: pool.clone(),
        config: config.clone(),
        assets: Arc::new(SqliteAssetStore::new(pool.clone())),
    });

    start_maintenance_tasks(pool.clone()).await;

    let metrics = Arc::new(Metrics::new());
    let server_config = config.server.clone();
    let security_config = config.security.clone();

    log::info!("Starting HTTP server on {}:{}", server_config.host, server_config.port);

    let server = HttpServer::new(move || {
        let max_request_size = security_config.max_request_size;

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(metrics.clone()))
            .wrap(setup_cors(&security_config.allowed_origins))
            .wrap(RequestLogger::new(metrics.clone()))
            .wrap(Logger::new(r#"%a "%r" %s %b "%{User-Agent}i" %T"#))
            .wrap(setup_security_headers(&security_config))
            .configure(|cfg| configure_routes(cfg, max_request_size))
    })
        .keep_alive(Duration::from_secs(server_config.keep_alive))
        .client_request_timeout(Duration::from_secs(server_config.client_timeout))
        .client_disconnect_timeout(Duration::from_secs(server_config.client_shutdown));

    let server = match server_config.workers {
        Some(workers) => server.workers(workers),
        None => server,
    };

    server
        .bind((server_config.host.as_str(), server_config.port))
        .context("Failed to bind server")?
        .run()
        .await
        .context("Server failed to run")?;

    Ok(())
}

// ==================== ROUTES ====================

pub fn configure_routes(cfg: &mut web::ServiceConfig, max_request_size: usize) {
    let json_config = web::JsonConfig::default()
        .limit(max_request_size)
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());
    let path_config = web::PathConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());
    let query_config = web::QueryConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into());

    cfg.app_data(json_config)
        .app_data(path_config)
        .app_data(query_config)
        .service(
            web::scope("/health")
                .route("", web::get().to(monitoring::health_check))
                .route("/live", web::get().to(monitoring::liveness_check))
                .route("/ready", web::get().to(monitoring::readiness_check))
                .route("/metrics", web::get().to(monitoring::metrics_endpoint))
        )
        .service(
            web::scope("/authenticate")
                .route("/login", web::post().to(login))
                .service(
                    web::resource("/me")
                        .wrap(HttpAuthentication::bearer(jwt_middleware))
                        .route(web::get().to(me))
                )
                .service(
                    web::resource("/logout")
                        .wrap(HttpAuthentication::bearer(jwt_middleware))
                        .route(web::post().to(logout))
                )
        )
        .service(
            web::scope("/api/dashboard")
                .wrap(HttpAuthentication::bearer(jwt_middleware))
                .route("/count/daily/{days}", web::get().to(get_daily_counts))
                .route("/count/{time}", web::get().to(get_period_count))
                .route("/summary/{stat}", web::get().to(get_summary))
                // fixed segments before /pending/{origin}
                .route("/pending", web::get().to(get_pending))
                .route("/pending/count", web::get().to(get_pending_count))
                .route("/pending/chart/{start_days}/{end_days}", web::get().to(get_pending_chart))
                .route(
                    "/pending/chart/{origin}/{start_days}/{end_days}",
                    web::get().to(get_pending_chart_by_origin),
                )
                .route(
                    "/pending/chart/{origin}/{parity}/{start_days}/{end_days}",
                    web::get().to(get_pending_chart_by_origin_parity),
                )
                .route("/pending/{origin}", web::get().to(get_pending_by_origin))
                .route("/pending/{origin}/{parity}", web::get().to(get_pending_by_origin_parity))
                .route("/cases/{start_time}/{end_time}", web::get().to(get_cases_by_sample_type))
                .route(
                    "/tat/{sample_type}/{start_values}/{end_values}",
                    web::get().to(get_tat_breakout),
                )
                .route(
                    "/requests/{sample_type}/{tat_start}/{tat_end}",
                    web::get().to(get_request_breakout),
                )
        );
}

// ==================== SETUP ====================

fn setup_logging(config: &Config) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.logging.level))
        .with_context(|| format!("Invalid log filter: {}", config.logging.level))?;

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "full" {
        registry
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .context("Failed to install logger")?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false).compact())
            .try_init()
            .context("Failed to install logger")?;
    }

    Ok(())
}

fn validate_production_config(config: &Config) -> anyhow::Result<()> {
    if config.auth.secret_generated {
        anyhow::bail!("JWT_SECRET must be set explicitly in production");
    }

    if config.security.allowed_origins.contains(&"*".to_string()) {
        anyhow::bail!("Wildcard CORS origins not allowed in production!");
    }

    if !config.security.require_https {
        log::warn!("HTTPS not required in production mode");
    }

    Ok(())
}

async fn create_database_pool(db_config: &config::DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&db_config.url)
        .with_context(|| format!("Invalid database url: {}", db_config.url))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(30));

    SqlitePoolOptions::new()
        .max_connections(db_config.max_connections)
        .min_connections(db_config.min_connections)
        .acquire_timeout(Duration::from_secs(db_config.connect_timeout))
        .idle_timeout(Duration::from_secs(db_config.idle_timeout))
        .connect_with(options)
        .await
        .context("Failed to connect to database")
}

fn setup_cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![CONTENT_TYPE, AUTHORIZATION])
        .max_age(3600);

    if allowed_origins.contains(&"*".to_string()) {
        cors = cors.allow_any_origin();
    } else {
        for origin in allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

fn setup_security_headers(config: &config::SecurityConfig) -> DefaultHeaders {
    let mut headers = DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("X-XSS-Protection", "1; mode=block"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"));

    if config.require_https {
        headers = headers.add((
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains; preload"
        ));
    }

    headers
}

async fn create_default_admin_if_needed(
    pool: &SqlitePool,
    auth_service: &AuthService,
) -> anyhow::Result<()> {
    if UserCredential::count(pool).await.map_err(|e| anyhow::anyhow!("{}", e))? > 0 {
        return Ok(());
    }

    let (password, generated) = match env::var("DEFAULT_ADMIN_PASSWORD") {
        Ok(password) if !password.is_empty() => (password, false),
        _ => {
            let password: String = thread_rng()
                .sample_iter(&Alphanumeric)
                .take(16)
                .map(char::from)
                .collect();
            (password, true)
        }
    };

    let hash = auth_service
        .hash_password(&password)
        .context("Failed to hash default admin password")?;

    UserCredential::create(pool, DEFAULT_ADMIN_USERNAME, &hash)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create default admin user: {}", e))?;

    log::warn!("Default admin user created:");
    log::warn!("  Username: {}", DEFAULT_ADMIN_USERNAME);
    if generated {
        log::warn!("  Password: {}", password);
        log::warn!("  This password is shown only once");
    } else {
        log::warn!("  Password: taken from DEFAULT_ADMIN_PASSWORD");
    }

    Ok(())
}
