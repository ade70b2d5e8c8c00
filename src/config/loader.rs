//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file, then apply environment
/// overrides.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: GatewayConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Defaults plus environment overrides, for running without a config file.
pub fn from_env() -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig::default();
    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Environment surface carried over from the original deployment contract:
/// `PORT`, `IP`, `SOCKET_TIMEOUT` (seconds), `REDIS_URL`, `SSL_KEY`,
/// `SSL_CERT`.
fn apply_env_overrides(config: &mut GatewayConfig) {
    let ip = std::env::var("IP").ok();
    let port = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok());
    if ip.is_some() || port.is_some() {
        let (default_ip, default_port) = split_bind_address(&config.listener.bind_address);
        config.listener.bind_address = format!(
            "{}:{}",
            ip.as_deref().unwrap_or(&default_ip),
            port.unwrap_or(default_port)
        );
    }

    if let Ok(timeout) = std::env::var("SOCKET_TIMEOUT") {
        if let Ok(secs) = timeout.parse() {
            config.timeouts.socket_idle_secs = secs;
        }
    }

    if let Ok(url) = std::env::var("REDIS_URL") {
        config.registry.url = url;
    }

    if let (Ok(key_path), Ok(cert_path)) = (std::env::var("SSL_KEY"), std::env::var("SSL_CERT")) {
        config.listener.tls = Some(crate::config::schema::TlsConfig {
            cert_path,
            key_path,
        });
    }
}

fn split_bind_address(bind_address: &str) -> (String, u16) {
    match bind_address.rsplit_once(':') {
        Some((ip, port)) => (ip.to_string(), port.parse().unwrap_or(8080)),
        None => (bind_address.to_string(), 8080),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.registry.namespace, "gateway");
        assert_eq!(config.timeouts.socket_idle_secs, 30);
    }

    #[test]
    fn test_partial_config_parses() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [registry]
            url = "redis://registry.internal:6379"
            namespace = "arena"
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.registry.namespace, "arena");
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn test_split_bind_address() {
        assert_eq!(split_bind_address("0.0.0.0:8080"), ("0.0.0.0".into(), 8080));
        assert_eq!(split_bind_address("127.0.0.1"), ("127.0.0.1".into(), 8080));
    }
}
