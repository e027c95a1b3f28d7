//! Top-level error wrapper types.

use crate::{BuilderError, ConfigError};

/// Every error condition the freshen crates can raise on their own.
///
/// Producer errors never appear here; they flow through the cache untouched.
///
/// # Examples
///
/// ```
/// use freshen_error::{ConfigError, FreshenError};
///
/// let err: FreshenError = ConfigError::new("missing ttl").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum FreshenErrorKind {
    /// Configuration loading or validation error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Builder error
    #[from(BuilderError)]
    Builder(BuilderError),
}

/// Freshen error with kind discrimination.
///
/// # Examples
///
/// ```
/// use freshen_error::{FreshenErrorKind, FreshenResult, ConfigError};
///
/// fn might_fail() -> FreshenResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// let err = might_fail().unwrap_err();
/// assert!(matches!(err.kind(), FreshenErrorKind::Config(_)));
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Freshen Error: {}", _0)]
pub struct FreshenError(Box<FreshenErrorKind>);

impl FreshenError {
    /// Create a new error from a kind.
    pub fn new(kind: FreshenErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &FreshenErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to FreshenErrorKind
impl<T> From<T> for FreshenError
where
    T: Into<FreshenErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for freshen operations.
pub type FreshenResult<T> = std::result::Result<T, FreshenError>;
