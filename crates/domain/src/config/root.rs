use serde::{Deserialize, Serialize};

use super::blocking::BlockingConfig;
use super::database::DatabaseConfig;
use super::dns::DnsConfig;
use super::errors::ConfigError;
use super::logging::LoggingConfig;
use super::server::ServerConfig;

const LOCAL_CONFIG: &str = "sinkhole-dns.toml";
const SYSTEM_CONFIG: &str = "/etc/sinkhole-dns/config.toml";

/// Main configuration structure for Sinkhole DNS
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Listen addresses and ports
    #[serde(default)]
    pub server: ServerConfig,

    /// Resolution, forwarding and local zone data
    #[serde(default)]
    pub dns: DnsConfig,

    /// Block list ingestion and redirect behaviour
    #[serde(default)]
    pub blocking: BlockingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub database: DatabaseConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. sinkhole-dns.toml in current directory
    /// 3. /etc/sinkhole-dns/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if std::path::Path::new(LOCAL_CONFIG).exists() {
            Self::from_file(LOCAL_CONFIG)?
        } else if std::path::Path::new(SYSTEM_CONFIG).exists() {
            Self::from_file(SYSTEM_CONFIG)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(port) = overrides.dns_port {
            self.server.dns_port = port;
        }
        if let Some(db) = overrides.database_path {
            self.database.path = db;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(dir) = overrides.lists_dir {
            self.blocking.lists_dir = dir;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.dns_port == 0 {
            return Err(ConfigError::Validation("DNS port cannot be 0".to_string()));
        }

        if self.server.listen_v4.is_empty() && self.server.listen_v6.is_empty() {
            return Err(ConfigError::Validation(
                "No listen addresses configured".to_string(),
            ));
        }

        self.dns
            .forwarder_addrs()
            .map_err(ConfigError::Validation)?;
        self.dns.probe_addr().map_err(ConfigError::Validation)?;

        let doh_usable = self.dns.doh_enabled && !self.dns.doh_endpoints.is_empty();
        if !doh_usable && self.dns.forwarders.is_empty() {
            return Err(ConfigError::Validation(
                "No upstream resolvers configured".to_string(),
            ));
        }

        if self.dns.doh_enabled {
            if let Some(bad) = self
                .dns
                .doh_endpoints
                .iter()
                .find(|url| !url.starts_with("https://"))
            {
                return Err(ConfigError::Validation(format!(
                    "DoH endpoint must use https: {}",
                    bad
                )));
            }
        }

        for record in &self.dns.local_records {
            if record.ip.parse::<std::net::IpAddr>().is_err() {
                return Err(ConfigError::Validation(format!(
                    "Local record '{}' has invalid IP '{}'",
                    record.hostname, record.ip
                )));
            }
            if !matches!(record.record_type.to_uppercase().as_str(), "A" | "AAAA") {
                return Err(ConfigError::Validation(format!(
                    "Local record '{}' has unsupported type '{}'",
                    record.hostname, record.record_type
                )));
            }
        }

        if self.blocking.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "Block list queue capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub dns_port: Option<u16>,
    pub database_path: Option<String>,
    pub log_level: Option<String>,
    pub lists_dir: Option<String>,
}
