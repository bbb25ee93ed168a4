//! Configuration validation

use std::path::Component;

use regex::Regex;
use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::{Config, PublishConfig};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_packages(config)?;
    validate_publish(&config.publish)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_packages(config: &Config) -> Result<()> {
    if config.packages.is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "packages".to_string(),
            message: "at least one package pattern is required".to_string(),
        }
        .into());
    }

    for pattern in &config.packages {
        if let Err(e) = glob::Pattern::new(pattern) {
            return Err(ConfigError::InvalidValue {
                field: "packages".to_string(),
                message: format!("invalid glob '{}': {}", pattern, e),
            }
            .into());
        }
    }

    Ok(())
}

/// Validate the publish section on its own (also used for CLI overrides)
pub fn validate_publish(publish: &PublishConfig) -> Result<()> {
    if publish.concurrency == 0 {
        return Err(ConfigError::InvalidValue {
            field: "publish.concurrency".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    if publish.pack_concurrency == Some(0) {
        return Err(ConfigError::InvalidValue {
            field: "publish.pack_concurrency".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    if let Some(tag) = &publish.dist_tag {
        validate_dist_tag(tag)?;
    }

    if let Some(registry) = &publish.registry {
        match url::Url::parse(registry) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::InvalidValue {
                    field: "publish.registry".to_string(),
                    message: format!("unsupported scheme '{}'", url.scheme()),
                }
                .into());
            }
            Err(e) => {
                return Err(ConfigError::InvalidValue {
                    field: "publish.registry".to_string(),
                    message: format!("invalid URL '{}': {}", registry, e),
                }
                .into());
            }
        }
    }

    if let Some(contents) = &publish.contents {
        let escapes = contents
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ConfigError::InvalidValue {
                field: "publish.contents".to_string(),
                message: "must be a relative path inside the package".to_string(),
            }
            .into());
        }
    }

    Ok(())
}

/// Dist-tags must not look like versions or ranges, which npm would reject
pub fn validate_dist_tag(tag: &str) -> Result<()> {
    let valid = Regex::new(r"^[A-Za-z][A-Za-z0-9._-]*$")
        .map(|re| re.is_match(tag))
        .unwrap_or(false);

    if !valid || semver::VersionReq::parse(tag).is_ok() {
        return Err(ConfigError::InvalidValue {
            field: "publish.dist_tag".to_string(),
            message: format!("'{}' is not a valid dist-tag", tag),
        }
        .into());
    }

    Ok(())
}
