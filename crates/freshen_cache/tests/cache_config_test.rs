//! Tests for cache configuration loading and validation.

use freshen_cache::{CacheConfig, CacheConfigBuilder, RefreshCache};
use freshen_error::FreshenErrorKind;
use std::time::Duration;

#[test]
fn test_default_config() {
    let config = CacheConfig::default();
    assert_eq!(config.name(), &None);
    assert_eq!(*config.ttl_secs(), 300);
    assert_eq!(config.ttl(), Duration::from_secs(300));
    assert!(config.validate().is_ok());
}

#[test]
fn test_from_toml_str() {
    let config = CacheConfig::from_toml_str(
        r#"
name = "exchange-rates"
ttl_secs = 60
"#,
    )
    .unwrap();

    assert_eq!(config.name().as_deref(), Some("exchange-rates"));
    assert_eq!(config.ttl(), Duration::from_secs(60));
}

#[test]
fn test_from_toml_str_fills_defaults() {
    let config = CacheConfig::from_toml_str(r#"name = "bare""#).unwrap();
    assert_eq!(config.ttl(), Duration::from_secs(300));
    assert!(!*config.allow_zero_ttl());
}

#[test]
fn test_ttl_millis_takes_precedence() {
    let config = CacheConfig::from_toml_str(
        r#"
ttl_secs = 10
ttl_millis = 250
"#,
    )
    .unwrap();
    assert_eq!(config.ttl(), Duration::from_millis(250));
}

#[test]
fn test_zero_ttl_rejected_unless_allowed() {
    let err = CacheConfig::from_toml_str("ttl_secs = 0").unwrap_err();
    assert!(matches!(err.kind(), FreshenErrorKind::Config(_)));

    let config = CacheConfig::from_toml_str(
        r#"
ttl_secs = 0
allow_zero_ttl = true
"#,
    )
    .unwrap();
    assert!(config.ttl().is_zero());
}

#[test]
fn test_malformed_toml_is_config_error() {
    let err = CacheConfig::from_toml_str("ttl_secs = = 3").unwrap_err();
    assert!(matches!(err.kind(), FreshenErrorKind::Config(_)));
    assert!(format!("{}", err).contains("cache configuration"));
}

#[test]
fn test_config_from_file() {
    use std::io::Write;
    use tempfile::Builder;

    let mut temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        temp_file,
        r#"
name = "tokens"
ttl_secs = 45
"#
    )
    .unwrap();
    temp_file.flush().unwrap();

    let config = CacheConfig::from_file(temp_file.path()).unwrap();
    assert_eq!(config.name().as_deref(), Some("tokens"));
    assert_eq!(config.ttl(), Duration::from_secs(45));
}

#[test]
fn test_missing_file_is_config_error() {
    let err = CacheConfig::from_file("/definitely/not/here/freshen.toml").unwrap_err();
    assert!(matches!(err.kind(), FreshenErrorKind::Config(_)));
}

#[test]
fn test_builder_defaults_and_overrides() {
    let config = CacheConfigBuilder::default().build().unwrap();
    assert_eq!(config, CacheConfig::default());

    let config = CacheConfigBuilder::default()
        .name("rates")
        .ttl_secs(5u64)
        .build()
        .unwrap();
    assert_eq!(config.name().as_deref(), Some("rates"));
    assert_eq!(config.ttl(), Duration::from_secs(5));
}

#[test]
fn test_builder_rejects_zero_ttl() {
    let err = CacheConfigBuilder::default().ttl_secs(0u64).build().unwrap_err();
    assert!(matches!(err.kind(), FreshenErrorKind::Builder(_)));

    let config = CacheConfigBuilder::default()
        .ttl_secs(0u64)
        .allow_zero_ttl(true)
        .build()
        .unwrap();
    assert_eq!(config, CacheConfig::always_refresh());
}

#[test]
fn test_setters_and_from_config() {
    let config = CacheConfig::default()
        .with_ttl_secs(0)
        .with_allow_zero_ttl(false);
    assert!(RefreshCache::<u32, String>::from_config(&config).is_err());

    let config = CacheConfig::always_refresh().with_name(Some("always".to_string()));
    let cache = RefreshCache::<u32, String>::from_config(&config).unwrap();
    assert_eq!(cache.name(), "always");
    assert_eq!(cache.get(|| Ok(1)), Ok(1));
    assert_eq!(cache.get(|| Ok(2)), Ok(2));
}

#[test]
fn test_config_serializes_to_json() {
    let config = CacheConfig::default().with_name(Some("json".to_string()));
    let value = serde_json::to_value(&config).unwrap();
    assert_eq!(value["name"], "json");
    assert_eq!(value["ttl_secs"], 300);
}
