use super::*;

#[test]
fn test_validate_default_config() {
    let config = Config::default();
    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_validate_zero_debounce() {
    let mut config = Config::default();
    config.watcher.debounce_ms = 0;

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert!(result.errors.iter().any(|e| e.path == "watcher.debounce_ms"));
}

#[test]
fn test_validate_high_debounce_warning() {
    let mut config = Config::default();
    config.watcher.debounce_ms = 10_000;

    let result = ConfigValidator::validate(&config);
    assert!(result.is_valid());
    assert!(result.warnings.iter().any(|w| w.path == "watcher.debounce_ms"));
}

#[test]
fn test_validate_zero_timeout_when_set() {
    let mut config = Config::default();
    config.channel.request_timeout_ms = Some(0);

    let result = ConfigValidator::validate(&config);
    assert!(result.errors.iter().any(|e| e.path == "channel.request_timeout_ms"));
}

#[test]
fn test_validate_relay_limits() {
    let mut config = Config::default();
    config.relay.poll_interval_ms = 0;
    config.relay.max_queue = 0;

    let result = ConfigValidator::validate(&config);
    assert_eq!(result.errors.len(), 2);
}

#[test]
fn test_validate_unknown_log_level() {
    let mut config = Config::default();
    config.logging.level = "verbose".to_string();

    let result = ConfigValidator::validate(&config);
    assert!(!result.is_valid());
    assert!(result.errors[0].message.contains("verbose"));
}

#[test]
fn test_validate_log_level_case_insensitive() {
    let mut config = Config::default();
    config.logging.level = "DEBUG".to_string();

    assert!(ConfigValidator::validate(&config).is_valid());
}
