//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the bind address parses as a socket address
//! - Validate the upstream URL parses with an http/https scheme and a host
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system; an invalid upstream
//!   URL must never survive past startup

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic validation failure.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid upstream url '{url}': {source}")]
    UpstreamUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("unsupported upstream scheme '{0}' (expected http or https)")]
    UpstreamScheme(String),

    #[error("upstream url '{0}' has no host")]
    UpstreamHost(String),
}

/// Validate a configuration, collecting every failure.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    match config.upstream.parsed() {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                errors.push(ValidationError::UpstreamScheme(url.scheme().to_string()));
            }
            if url.host_str().is_none() {
                errors.push(ValidationError::UpstreamHost(config.upstream.url.clone()));
            }
        }
        Err(source) => {
            errors.push(ValidationError::UpstreamUrl {
                url: config.upstream.url.clone(),
                source,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
