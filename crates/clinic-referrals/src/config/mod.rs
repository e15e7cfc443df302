use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::Duration;

use crate::workflows::commission::{CommissionTierTable, DEFAULT_COMMISSION_RATE};
use crate::workflows::intake::dedup::DEFAULT_DEDUP_TTL_SECS;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the referral service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub commission: CommissionConfig,
    pub intake: IntakeConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::parse(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            commission: CommissionConfig::from_env()?,
            intake: IntakeConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Commission settings. A missing or unreadable tier table means tiered rates are off.
#[derive(Debug, Clone)]
pub struct CommissionConfig {
    pub tiers: Option<CommissionTierTable>,
    /// Why `APP_COMMISSION_TIERS` was ignored. Config loads before logging is set up, so the
    /// binary reports this once telemetry is running.
    pub tiers_error: Option<String>,
    pub default_rate: f64,
}

impl CommissionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let (tiers, tiers_error) = match env::var("APP_COMMISSION_TIERS") {
            Ok(raw) if !raw.trim().is_empty() => match CommissionTierTable::from_json(&raw) {
                Ok(table) => (Some(table), None),
                Err(error) => (None, Some(error.to_string())),
            },
            _ => (None, None),
        };

        let default_rate = match env::var("APP_DEFAULT_COMMISSION_RATE") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|rate| (0.0..=100.0).contains(rate))
                .ok_or(ConfigError::InvalidDefaultRate(raw))?,
            Err(_) => DEFAULT_COMMISSION_RATE,
        };

        Ok(Self {
            tiers,
            tiers_error,
            default_rate,
        })
    }
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self {
            tiers: None,
            tiers_error: None,
            default_rate: DEFAULT_COMMISSION_RATE,
        }
    }
}

/// Report intake settings.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub dedup_ttl_secs: i64,
}

impl IntakeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let dedup_ttl_secs = match env::var("APP_REPORT_DEDUP_TTL_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidDedupTtl(raw))?,
            Err(_) => DEFAULT_DEDUP_TTL_SECS,
        };
        Ok(Self { dedup_ttl_secs })
    }

    pub fn dedup_ttl(&self) -> Duration {
        Duration::seconds(self.dedup_ttl_secs)
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            dedup_ttl_secs: DEFAULT_DEDUP_TTL_SECS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidDefaultRate(String),
    InvalidDedupTtl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidDefaultRate(raw) => write!(
                f,
                "APP_DEFAULT_COMMISSION_RATE must be a percentage within 0..=100, got '{raw}'"
            ),
            ConfigError::InvalidDedupTtl(raw) => write!(
                f,
                "APP_REPORT_DEDUP_TTL_SECS must be a positive number of seconds, got '{raw}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
