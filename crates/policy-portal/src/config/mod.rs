use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::workflows::submission::{Credential, IntegrationMode, ModeKind};

const DEFAULT_INTEGRATOR_URL: &str = "http://localhost:9090/policy";
const DEFAULT_GATEWAY_URL: &str = "https://localhost:8300/policy/1.0.0/policy";
const DEFAULT_TIMEOUT_SECS: u64 = 15;
const DEFAULT_PROGRESS_STEP_MS: u64 = 500;

/// Distinguishes runtime behavior for different stages of the portal.
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

/// Top-level configuration for the portal and its stub collaborator.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub integration: IntegrationConfig,
    pub progress: ProgressConfig,
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

        let default_mode = match env::var("PORTAL_API_MODE") {
            Ok(raw) => raw
                .parse::<ModeKind>()
                .map_err(|_| ConfigError::InvalidMode { value: raw })?,
            Err(_) => ModeKind::DirectIntegrator,
        };

        let timeout_secs = parse_u64("PORTAL_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .map_err(|value| ConfigError::InvalidTimeout { value })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout {
                value: "0".to_string(),
            });
        }

        let step_ms = parse_u64("PORTAL_PROGRESS_STEP_MS", DEFAULT_PROGRESS_STEP_MS)
            .map_err(|value| ConfigError::InvalidProgressStep { value })?;

        let insecure_tls = match env::var("PORTAL_GATEWAY_INSECURE_TLS") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                name: "PORTAL_GATEWAY_INSECURE_TLS",
                value: raw,
            })?,
            Err(_) => false,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            integration: IntegrationConfig {
                default_mode,
                direct_url: env::var("PORTAL_INTEGRATOR_URL")
                    .unwrap_or_else(|_| DEFAULT_INTEGRATOR_URL.to_string()),
                gateway_url: env::var("PORTAL_GATEWAY_URL")
                    .unwrap_or_else(|_| DEFAULT_GATEWAY_URL.to_string()),
                gateway_token: env::var("PORTAL_GATEWAY_TOKEN").ok().and_then(Credential::new),
                timeout: Duration::from_secs(timeout_secs),
                insecure_tls,
            },
            progress: ProgressConfig {
                step: Duration::from_millis(step_ms),
            },
        })
    }
}

fn parse_u64(name: &str, default: u64) -> Result<u64, String> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<u64>().map_err(|_| raw),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
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

/// Backend endpoints and transport settings for both integration modes.
#[derive(Debug, Clone)]
pub struct IntegrationConfig {
    pub default_mode: ModeKind,
    pub direct_url: String,
    pub gateway_url: String,
    pub gateway_token: Option<Credential>,
    pub timeout: Duration,
    pub insecure_tls: bool,
}

impl IntegrationConfig {
    pub fn mode(&self, kind: ModeKind) -> IntegrationMode {
        match kind {
            ModeKind::DirectIntegrator => IntegrationMode::direct(self.direct_url.clone()),
            ModeKind::GatewayFronted => {
                IntegrationMode::gateway(self.gateway_url.clone(), self.gateway_token.clone())
            }
        }
    }

    pub fn default_mode(&self) -> IntegrationMode {
        self.mode(self.default_mode)
    }
}

/// Pacing of the processing screen. The base step doubles as the settle delay.
#[derive(Debug, Clone, Copy)]
pub struct ProgressConfig {
    pub step: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidMode { value: String },
    InvalidTimeout { value: String },
    InvalidProgressStep { value: String },
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidMode { value } => write!(
                f,
                "PORTAL_API_MODE '{value}' is not a known mode (expected INTEGRATOR or API_MANAGER)"
            ),
            ConfigError::InvalidTimeout { value } => write!(
                f,
                "PORTAL_REQUEST_TIMEOUT_SECS '{value}' must be a positive number of seconds"
            ),
            ConfigError::InvalidProgressStep { value } => write!(
                f,
                "PORTAL_PROGRESS_STEP_MS '{value}' must be a whole number of milliseconds"
            ),
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{name} '{value}' must be true or false")
            }
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "PORTAL_API_MODE",
            "PORTAL_INTEGRATOR_URL",
            "PORTAL_GATEWAY_URL",
            "PORTAL_GATEWAY_TOKEN",
            "PORTAL_GATEWAY_INSECURE_TLS",
            "PORTAL_REQUEST_TIMEOUT_SECS",
            "PORTAL_PROGRESS_STEP_MS",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.integration.default_mode, ModeKind::DirectIntegrator);
        assert_eq!(config.integration.direct_url, DEFAULT_INTEGRATOR_URL);
        assert_eq!(config.integration.gateway_url, DEFAULT_GATEWAY_URL);
        assert!(config.integration.gateway_token.is_none());
        assert_eq!(config.integration.timeout, Duration::from_secs(15));
        assert!(!config.integration.insecure_tls);
        assert_eq!(config.progress.step, Duration::from_millis(500));
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn gateway_mode_carries_configured_token() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PORTAL_API_MODE", "API_MANAGER");
        env::set_var("PORTAL_GATEWAY_TOKEN", "eyJhbGciOiJIUzI1NiJ9.payload.signature");
        env::set_var("PORTAL_GATEWAY_INSECURE_TLS", "true");
        let config = AppConfig::load().expect("config loads");

        assert_eq!(config.integration.default_mode, ModeKind::GatewayFronted);
        assert!(config.integration.insecure_tls);
        let mode = config.integration.default_mode();
        assert_eq!(mode.kind(), ModeKind::GatewayFronted);
        assert_eq!(
            mode.credential().map(Credential::expose),
            Some("eyJhbGciOiJIUzI1NiJ9.payload.signature")
        );
    }

    #[test]
    fn blank_gateway_token_means_no_credential() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PORTAL_GATEWAY_TOKEN", "   ");
        let config = AppConfig::load().expect("config loads");
        assert!(config.integration.gateway_token.is_none());
    }

    #[test]
    fn rejects_unknown_mode_and_bad_numbers() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PORTAL_API_MODE", "carrier-pigeon");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidMode { .. })
        ));

        reset_env();
        env::set_var("PORTAL_REQUEST_TIMEOUT_SECS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidTimeout { .. })
        ));

        reset_env();
        env::set_var("PORTAL_PROGRESS_STEP_MS", "fast");
        let err = AppConfig::load().expect_err("non-numeric step rejected");
        assert!(err.to_string().contains("PORTAL_PROGRESS_STEP_MS"));

        reset_env();
        env::set_var("PORTAL_GATEWAY_INSECURE_TLS", "maybe");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidFlag { .. })
        ));
        reset_env();
    }
}
