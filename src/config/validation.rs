//! Configuration validation.
//!
//! Semantic checks on top of what serde already guarantees. Returns every
//! error found, not just the first, so a broken config can be fixed in one
//! pass.

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid {field} address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("invalid registry url '{value}': {reason}")]
    InvalidRegistryUrl { value: String, reason: String },

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("tls {field} path is empty")]
    EmptyTlsPath { field: &'static str },
}

/// Validate a configuration. Pure: no filesystem or network access.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.tls.is_some() {
        check_address(
            &mut errors,
            "listener.redirect_bind_address",
            &config.listener.redirect_bind_address,
        );
    }

    match Url::parse(&config.registry.url) {
        Ok(url) => {
            if url.scheme() != "redis" && url.scheme() != "rediss" {
                errors.push(ValidationError::InvalidRegistryUrl {
                    value: config.registry.url.clone(),
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                });
            }
        }
        Err(e) => errors.push(ValidationError::InvalidRegistryUrl {
            value: config.registry.url.clone(),
            reason: e.to_string(),
        }),
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "timeouts.request_secs",
        });
    }
    if config.timeouts.socket_idle_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "timeouts.socket_idle_secs",
        });
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() {
            errors.push(ValidationError::EmptyTlsPath { field: "cert" });
        }
        if tls.key_path.is_empty() {
            errors.push(ValidationError::EmptyTlsPath { field: "key" });
        }
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TlsConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.listener.bind_address = "nonsense".into();
        config.registry.url = "http://not-redis".into();
        config.timeouts.socket_idle_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_tls_paths_must_be_present() {
        let mut config = GatewayConfig::default();
        config.listener.tls = Some(TlsConfig {
            cert_path: String::new(),
            key_path: "/etc/gateway/key.pem".into(),
        });

        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::EmptyTlsPath { field: "cert" })));
    }
}
