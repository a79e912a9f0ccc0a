use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::placement::{MissingProgramPolicy, PeriodId, PlacementPolicy, MAX_PREFERENCES};

const DEFAULT_PERIOD: &str = "2025-spring";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub placement: PlacementConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
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
            placement: PlacementConfig::from_env()?,
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

/// Preference limits and the catalog source loaded at startup.
#[derive(Debug, Clone)]
pub struct PlacementConfig {
    pub policy: PlacementPolicy,
    pub catalog_csv: Option<PathBuf>,
    pub period: PeriodId,
}

impl PlacementConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let max_preferences = match env::var("PLACEMENT_MAX_PREFERENCES") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(value) if (1..=MAX_PREFERENCES).contains(&value) => value,
                _ => return Err(ConfigError::InvalidMaxPreferences { value: raw }),
            },
            Err(_) => MAX_PREFERENCES,
        };

        let missing_programs = match env::var("PLACEMENT_MISSING_PROGRAMS") {
            Ok(raw) => MissingProgramPolicy::parse(&raw)
                .ok_or(ConfigError::InvalidMissingProgramPolicy { value: raw })?,
            Err(_) => MissingProgramPolicy::default(),
        };

        let catalog_csv = env::var("PLACEMENT_CATALOG_CSV")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let period = env::var("PLACEMENT_PERIOD")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_PERIOD.to_string());

        Ok(Self {
            policy: PlacementPolicy {
                max_preferences,
                missing_programs,
            },
            catalog_csv,
            period: PeriodId(period),
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidMaxPreferences { value: String },
    InvalidMissingProgramPolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidMaxPreferences { value } => write!(
                f,
                "PLACEMENT_MAX_PREFERENCES must be between 1 and {}, got '{}'",
                MAX_PREFERENCES, value
            ),
            ConfigError::InvalidMissingProgramPolicy { value } => write!(
                f,
                "PLACEMENT_MISSING_PROGRAMS must be 'skip' or 'reject', got '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidMaxPreferences { .. }
            | ConfigError::InvalidMissingProgramPolicy { .. } => None,
        }
    }
}
