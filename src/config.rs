use crate::error::{Error, Result};
use crate::pool::{ContextPool, FreshPool, RecyclingPool};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest request body accepted, in bytes
    #[serde(default = "default_max_body")]
    pub max_body: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// `false` swaps the recycling pool for one that never reuses contexts
    #[serde(default = "default_pool_enabled")]
    pub enabled: bool,

    /// Idle contexts kept between requests; unset sizes from the CPU count
    #[serde(default)]
    pub max_idle: Option<usize>,

    /// Contexts constructed up front at startup
    #[serde(default)]
    pub warm_up: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_body() -> usize {
    2 * 1024 * 1024
}
fn default_pool_enabled() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body: default_max_body(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enabled: default_pool_enabled(),
            max_idle: None,
            warm_up: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let content = fs::read_to_string(path_ref).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path_ref.display(),
                e
            ))
        })?;

        let mut config = Self::from_toml_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path_ref.display(),
                e
            ))
        })?;
        config.apply_env_overrides()?;

        log::debug!(
            "Successfully loaded configuration from: {}",
            path_ref.display()
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Create configuration with environment variable overrides
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply `MISUGO_*` overrides read through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("MISUGO_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("MISUGO_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::config("Invalid MISUGO_PORT value"))?;
        }
        if let Some(max_body) = lookup("MISUGO_MAX_BODY") {
            self.server.max_body = max_body
                .parse()
                .map_err(|_| Error::config("Invalid MISUGO_MAX_BODY value"))?;
        }
        if let Some(max_idle) = lookup("MISUGO_POOL_MAX_IDLE") {
            self.pool.max_idle = Some(
                max_idle
                    .parse()
                    .map_err(|_| Error::config("Invalid MISUGO_POOL_MAX_IDLE value"))?,
            );
        }
        if let Some(level) = lookup("MISUGO_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Address the server binds to, as `host:port`
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Build the context pool described by the `[pool]` section
    pub fn build_pool(&self) -> Arc<dyn ContextPool> {
        if !self.pool.enabled {
            log::debug!("Context pooling disabled");
            return Arc::new(FreshPool::new());
        }

        let pool = match self.pool.max_idle {
            Some(max_idle) => RecyclingPool::new(max_idle),
            None => RecyclingPool::with_default_size(),
        };
        if self.pool.warm_up > 0 {
            pool.warm_up(self.pool.warm_up);
        }
        Arc::new(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server_address(), "0.0.0.0:8080");
        assert_eq!(config.server.max_body, 2 * 1024 * 1024);
        assert!(config.pool.enabled);
        assert_eq!(config.pool.max_idle, None);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 9000
            max_body = 1024

            [pool]
            max_idle = 32
            "#,
        )
        .unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.max_body, 1024);
        assert_eq!(config.pool.max_idle, Some(32));
        assert!(config.pool.enabled);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nhost = \"127.0.0.1\"\nport = 3000\n\n[logging]\nlevel = \"debug\""
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let err = AppConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server\nport = ").unwrap();
        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MISUGO_HOST", "localhost"),
            ("MISUGO_PORT", "7000"),
            ("MISUGO_POOL_MAX_IDLE", "8"),
            ("MISUGO_MAX_BODY", "65536"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server_address(), "localhost:7000");
        assert_eq!(config.pool.max_idle, Some(8));
        assert_eq!(config.server.max_body, 65536);

        let err = config
            .apply_overrides(|key| (key == "MISUGO_MAX_BODY").then(|| "-1".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = config
            .apply_overrides(|key| (key == "MISUGO_PORT").then(|| "eighty".to_string()))
            .unwrap_err();
        assert_eq!(err.to_string(), "configuration error: Invalid MISUGO_PORT value");
    }

    #[test]
    fn test_build_pool() {
        let mut config = AppConfig::default();
        config.pool.max_idle = Some(4);
        config.pool.warm_up = 2;
        let stats = config.build_pool().stats();
        assert_eq!(stats.max_idle, 4);
        assert_eq!(stats.idle, 2);

        config.pool.enabled = false;
        assert_eq!(config.build_pool().stats().max_idle, 0);
    }
}
