//! Error types for the freshen workspace.
//!
//! The refreshing cache itself never invents errors: whatever a producer
//! returns is handed back to callers verbatim. The types here cover the
//! ambient surface around it, namely loading and building cache configuration.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All constructors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use freshen_error::{ConfigError, FreshenResult};
//!
//! fn load_ttl() -> FreshenResult<u64> {
//!     Err(ConfigError::new("ttl_secs must be positive"))?
//! }
//!
//! match load_ttl() {
//!     Ok(ttl) => println!("ttl: {}", ttl),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod error;

pub use builder::{BuilderError, BuilderErrorKind};
pub use config::ConfigError;
pub use error::{FreshenError, FreshenErrorKind, FreshenResult};
