// src/config.rs - Configuration management
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rand::{thread_rng, Rng, distributions::Alphanumeric};

/// Upper bound for every reporting window, roughly a century.
pub const MAX_WINDOW_DAYS: i64 = 36_500;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub security: SecurityConfig,
    pub logging: LoggingConfig,
    pub reporting: ReportingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub keep_alive: u64,
    pub client_timeout: u64,
    pub client_shutdown: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: u64,
    pub idle_timeout: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// Empty means "generate one at startup".
    pub jwt_secret: String,
    pub token_expiration_hours: i64,
    pub bcrypt_cost: u32,
    #[serde(skip)]
    pub secret_generated: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub max_request_size: usize,
    pub require_https: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `compact` or `full`
    pub format: String,
}

/// Windows and limits of the dashboard reports.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReportingConfig {
    pub pending_window_days: i64,
    pub summary_window_days: i64,
    pub max_daily_days: i64,
    /// Pins "today" for the year-to-date count. Unset uses the live date.
    pub year_to_date_anchor: Option<NaiveDate>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            keep_alive: 30,
            client_timeout: 30,
            client_shutdown: 5,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:tracker.db".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: 30,
            idle_timeout: 600,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_expiration_hours: 10,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            secret_generated: false,
        }
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:4200".to_string(),
                "http://127.0.0.1:4200".to_string(),
            ],
            max_request_size: 64 * 1024,
            require_https: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            pending_window_days: 90,
            summary_window_days: 14,
            max_daily_days: 366,
            year_to_date_anchor: None,
        }
    }
}

pub fn generate_jwt_secret() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

pub fn load_config() -> Result<Config> {
    load_env_file()?;

    let mut config = match env::var("CONFIG_FILE") {
        Ok(config_file) => Config::from_toml_file(Path::new(&config_file))?,
        Err(_) => Config::default(),
    };

    config.apply_overrides(|key| env::var(key).ok())?;

    if config.auth.jwt_secret.is_empty() {
        config.auth.jwt_secret = generate_jwt_secret();
        config.auth.secret_generated = true;
    }

    config.validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Invalid value for {}: '{}'", key, raw))
}

impl Config {
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Applies environment overrides. `lookup` returns the raw value of a variable.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("BIND_ADDRESS") {
            self.server.host = host;
        }
        if let Some(port) = lookup("TRACKER_PORT") {
            self.server.port = parse_var("TRACKER_PORT", &port)?;
        }
        if let Some(workers) = lookup("TRACKER_WORKERS") {
            self.server.workers = Some(parse_var("TRACKER_WORKERS", &workers)?);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(max_conn) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("DATABASE_MAX_CONNECTIONS", &max_conn)?;
        }
        if let Some(jwt_secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = jwt_secret;
        }
        if let Some(hours) = lookup("AUTH_TOKEN_EXPIRATION_HOURS") {
            self.auth.token_expiration_hours = parse_var("AUTH_TOKEN_EXPIRATION_HOURS", &hours)?;
        }
        if let Some(cost) = lookup("AUTH_BCRYPT_COST") {
            self.auth.bcrypt_cost = parse_var("AUTH_BCRYPT_COST", &cost)?;
        }
        if let Some(origins) = lookup("ALLOWED_ORIGINS") {
            self.security.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }
        if let Some(days) = lookup("REPORT_PENDING_WINDOW_DAYS") {
            self.reporting.pending_window_days = parse_var("REPORT_PENDING_WINDOW_DAYS", &days)?;
        }
        if let Some(days) = lookup("REPORT_SUMMARY_WINDOW_DAYS") {
            self.reporting.summary_window_days = parse_var("REPORT_SUMMARY_WINDOW_DAYS", &days)?;
        }
        if let Some(anchor) = lookup("REPORT_YEAR_ANCHOR_DATE") {
            self.reporting.year_to_date_anchor = Some(parse_var("REPORT_YEAR_ANCHOR_DATE", &anchor)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long (current: {})",
                self.auth.jwt_secret.len()
            ));
        }

        if self.auth.token_expiration_hours <= 0 {
            return Err(anyhow::anyhow!("token_expiration_hours must be positive"));
        }

        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return Err(anyhow::anyhow!(
                "bcrypt_cost must be between 4 and 31 (current: {})",
                self.auth.bcrypt_cost
            ));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be at least 1"));
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(anyhow::anyhow!(
                "max_connections ({}) must be >= min_connections ({})",
                self.database.max_connections,
                self.database.min_connections
            ));
        }

        let reporting = &self.reporting;
        if reporting.pending_window_days <= 0
            || reporting.summary_window_days <= 0
            || reporting.max_daily_days <= 0
        {
            return Err(anyhow::anyhow!("reporting windows must be positive"));
        }

        if reporting.pending_window_days > MAX_WINDOW_DAYS
            || reporting.summary_window_days > MAX_WINDOW_DAYS
            || reporting.max_daily_days > MAX_WINDOW_DAYS
        {
            return Err(anyhow::anyhow!(
                "reporting windows must not exceed {} days",
                MAX_WINDOW_DAYS
            ));
        }

        if !matches!(self.logging.format.as_str(), "compact" | "full") {
            return Err(anyhow::anyhow!(
                "logging.format must be 'compact' or 'full' (current: {})",
                self.logging.format
            ));
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        env::var("TRACKER_ENV").map(|v| v == "production").unwrap_or(false)
    }

    pub fn print_startup_info(&self) {
        log::info!("🧪 Tracker dashboard starting up...");
        log::info!("🌐 Server: {}:{}", self.server.host, self.server.port);
        log::info!("💾 Database: {}", self.database.url);
        log::info!("🔒 Auth: JWT ({}h expiration)", self.auth.token_expiration_hours);
        log::info!("📊 Logging: {} level", self.logging.level);
        log::info!(
            "📅 Reports: pending window {}d, summary window {}d",
            self.reporting.pending_window_days,
            self.reporting.summary_window_days
        );

        if self.auth.secret_generated {
            log::warn!("JWT_SECRET is not set; using a random secret, tokens will not survive a restart");
        }

        if let Some(anchor) = self.reporting.year_to_date_anchor {
            log::warn!("Year-to-date count is pinned to {}", anchor);
        }

        if !self.is_production() {
            log::warn!("🚧 Running in development mode");
        }

        if self.security.require_https {
            log::info!("🔒 HTTPS enforcement enabled");
        } else if self.is_production() {
            log::warn!("⚠️  HTTPS not required in production mode");
        }
    }
}

pub fn load_env_file() -> Result<()> {
    if let Ok(env_file) = env::var("ENV_FILE") {
        dotenvy::from_filename(&env_file)
            .with_context(|| format!("Failed to load environment file: {}", env_file))?;
    } else if Path::new(".env").exists() {
        dotenvy::dotenv().context("Failed to load .env file")?;
    }
    Ok(())
}
