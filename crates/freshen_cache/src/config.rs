//! Configuration for refreshing caches.
//!
//! A cache needs very little: how long a value stays fresh and, optionally, a
//! name that shows up in tracing output. Configuration can be built in code or
//! loaded from TOML:
//!
//! ```toml
//! name = "exchange-rates"
//! ttl_secs = 60
//! ```

use config::{Config, File, FileFormat};
use derive_getters::Getters;
use freshen_error::{BuilderError, ConfigError, FreshenError, FreshenResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

/// Configuration for a single-slot refreshing cache.
///
/// # Example
///
/// ```
/// use freshen_cache::CacheConfigBuilder;
/// use std::time::Duration;
///
/// let config = CacheConfigBuilder::default()
///     .name("exchange-rates")
///     .ttl_secs(60u64)
///     .build()
///     .unwrap();
/// assert_eq!(config.ttl(), Duration::from_secs(60));
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(setter(into), build_fn(private, name = "build_internal"))]
pub struct CacheConfig {
    /// Label attached to tracing spans and events
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    name: Option<String>,

    /// How long a refreshed value stays fresh (seconds)
    #[builder(default = "default_ttl_secs()")]
    #[serde(default = "default_ttl_secs")]
    ttl_secs: u64,

    /// Sub-second TTL; takes precedence over `ttl_secs` when set
    #[builder(default, setter(into, strip_option))]
    #[serde(default)]
    ttl_millis: Option<u64>,

    /// Accept a zero TTL, which refreshes on every lookup
    #[builder(default)]
    #[serde(default)]
    allow_zero_ttl: bool,
}

fn default_ttl_secs() -> u64 {
    300 // 5 minutes
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: None,
            ttl_secs: default_ttl_secs(),
            ttl_millis: None,
            allow_zero_ttl: false,
        }
    }
}

impl CacheConfigBuilder {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns a builder error if the resulting TTL is zero and
    /// `allow_zero_ttl` was not set.
    pub fn build(&self) -> FreshenResult<CacheConfig> {
        let config = self
            .build_internal()
            .map_err(|e| FreshenError::from(BuilderError::from(e.to_string())))?;
        if config.ttl().is_zero() && !config.allow_zero_ttl {
            return Err(BuilderError::invalid_field(
                "ttl_secs",
                "TTL must be positive unless allow_zero_ttl is set",
            )
            .into());
        }
        Ok(config)
    }
}

impl CacheConfig {
    /// Configuration that refreshes on every lookup.
    pub fn always_refresh() -> Self {
        Self {
            name: None,
            ttl_secs: 0,
            ttl_millis: None,
            allow_zero_ttl: true,
        }
    }

    /// The effective time-to-live.
    pub fn ttl(&self) -> Duration {
        match self.ttl_millis {
            Some(millis) => Duration::from_millis(millis),
            None => Duration::from_secs(self.ttl_secs),
        }
    }

    /// Check that the configuration describes a usable cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the TTL is zero and `allow_zero_ttl` is not set.
    pub fn validate(&self) -> FreshenResult<()> {
        if self.ttl().is_zero() && !self.allow_zero_ttl {
            return Err(ConfigError::new(
                "Cache TTL is zero; set allow_zero_ttl to refresh on every lookup",
            )
            .into());
        }
        Ok(())
    }

    /// Load configuration from a specific file path.
    ///
    /// The format is picked from the file extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<std::path::Path>) -> FreshenResult<Self> {
        debug!("Loading cache configuration from file");

        let config: Self = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .map_err(|e| {
                FreshenError::from(ConfigError::new(format!(
                    "Failed to read cache configuration from {}: {}",
                    path.as_ref().display(),
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                FreshenError::from(ConfigError::new(format!(
                    "Failed to parse cache configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid TOML, does not match the
    /// configuration shape, or fails validation.
    #[instrument(skip(toml))]
    pub fn from_toml_str(toml: &str) -> FreshenResult<Self> {
        debug!("Loading cache configuration from TOML string");

        let config: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(|e| {
                FreshenError::from(ConfigError::new(format!(
                    "Failed to build cache configuration: {}",
                    e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                FreshenError::from(ConfigError::new(format!(
                    "Failed to parse cache configuration: {}",
                    e
                )))
            })?;

        config.validate()?;
        Ok(config)
    }
}
