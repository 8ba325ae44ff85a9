use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Shortest accepted HMAC secret, in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub tokens: TokenConfig,

    pub password_reset: PasswordResetConfig,

    pub security: SecurityConfig,

    pub maintenance: MaintenanceConfig,

    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/authkeep.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8088,
            cors_allowed_origins: vec![
                "http://localhost:8088".to_string(),
                "http://127.0.0.1:8088".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HMAC secret for access tokens. When empty a random secret is generated
    /// at startup, which invalidates every access token on restart.
    pub jwt_secret: String,

    pub issuer: String,

    pub access_token_ttl_seconds: u64,

    /// Absolute lifetime of a session's refresh token, counted from login.
    pub refresh_token_ttl_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            issuer: "authkeep".to_string(),
            access_token_ttl_seconds: 15 * 60,
            refresh_token_ttl_seconds: 7 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordResetConfig {
    pub token_ttl_seconds: u64,

    pub min_password_length: usize,

    /// Return the plaintext reset token from the request endpoint.
    /// Only for local development where no mailer is wired up.
    pub expose_token_in_response: bool,
}

impl Default for PasswordResetConfig {
    fn default() -> Self {
        Self {
            token_ttl_seconds: 60 * 60,
            min_password_length: 8,
            expose_token_in_response: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    pub argon2_parallelism: u32,

    /// Trusted proxy IP addresses allowed to provide `X-Forwarded-For`.
    ///
    /// When empty, forwarded headers are ignored and the socket peer
    /// address is recorded on sessions.
    pub trusted_proxy_ips: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            trusted_proxy_ips: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub enabled: bool,

    /// Six-field cron expression (seconds first).
    pub cron_expression: String,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron_expression: "0 */10 * * * *".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = HashMap::new();
        labels.insert("app".to_string(), "authkeep".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("authkeep").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".authkeep").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            Self::default().save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tokens.jwt_secret.is_empty()
            && self.tokens.jwt_secret.len() < MIN_JWT_SECRET_BYTES
        {
            anyhow::bail!("tokens.jwt_secret must be at least {MIN_JWT_SECRET_BYTES} bytes");
        }

        if self.tokens.access_token_ttl_seconds == 0 {
            anyhow::bail!("tokens.access_token_ttl_seconds must be > 0");
        }

        if self.tokens.refresh_token_ttl_seconds < self.tokens.access_token_ttl_seconds {
            anyhow::bail!("tokens.refresh_token_ttl_seconds must not be shorter than the access token TTL");
        }

        if self.password_reset.token_ttl_seconds == 0 {
            anyhow::bail!("password_reset.token_ttl_seconds must be > 0");
        }

        if self.password_reset.min_password_length == 0 {
            anyhow::bail!("password_reset.min_password_length must be > 0");
        }

        if self.maintenance.enabled && self.maintenance.cron_expression.trim().is_empty() {
            anyhow::bail!("maintenance.cron_expression must be set when maintenance is enabled");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("general.min_db_connections cannot exceed max_db_connections");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.tokens.access_token_ttl_seconds, 900);
        assert_eq!(config.tokens.refresh_token_ttl_seconds, 604_800);
        assert_eq!(config.password_reset.token_ttl_seconds, 3600);
        assert!(!config.password_reset.expose_token_in_response);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[tokens]"));
        assert!(toml_str.contains("[password_reset]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [tokens]
            access_token_ttl_seconds = 300
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.tokens.access_token_ttl_seconds, 300);
        assert_eq!(config.tokens.refresh_token_ttl_seconds, 604_800);
        assert_eq!(config.maintenance.cron_expression, "0 */10 * * * *");
    }

    #[test]
    fn short_secret_is_rejected() {
        let mut config = Config::default();
        config.tokens.jwt_secret = "too-short".to_string();
        assert!(config.validate().is_err());

        config.tokens.jwt_secret = "x".repeat(MIN_JWT_SECRET_BYTES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn refresh_shorter_than_access_is_rejected() {
        let mut config = Config::default();
        config.tokens.refresh_token_ttl_seconds = 60;
        assert!(config.validate().is_err());
    }
}
