//! Configuration loading from disk and the environment.

use std::path::Path;
use std::{env, fs};

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(ValidationErrors),
}

/// All semantic validation failures, collected rather than first-only.
#[derive(Debug)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

/// Load, override from the environment, and validate configuration.
///
/// With no file path the defaults apply, so the proxy runs unconfigured:
/// listen on 8080, forward to the IdleMMO API.
pub fn load(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config);

    validate_config(&config).map_err(|errors| ConfigError::Validation(ValidationErrors(errors)))?;

    Ok(config)
}

/// Apply environment overrides: `PORT`, `UPSTREAM_URL`, `LOG_LEVEL`.
fn apply_env_overrides(config: &mut ProxyConfig) {
    let port = env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok());
    let url = env::var("UPSTREAM_URL").ok().filter(|u| !u.is_empty());
    let level = env::var("LOG_LEVEL").ok().filter(|l| !l.is_empty());
    apply_overrides(config, port, url, level);
}

fn apply_overrides(
    config: &mut ProxyConfig,
    port: Option<u16>,
    upstream_url: Option<String>,
    log_level: Option<String>,
) {
    if let Some(port) = port {
        config.listener.set_port(port);
    }
    if let Some(url) = upstream_url {
        config.upstream.url = url;
    }
    if let Some(level) = log_level {
        config.observability.log_level = level;
    }
}
