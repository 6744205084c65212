//! Configuration validation.

use crate::schema::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_watcher(config, &mut result);
        Self::validate_channel(config, &mut result);
        Self::validate_relay(config, &mut result);
        Self::validate_fetch(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_watcher(config: &Config, result: &mut ValidationResult) {
        if config.watcher.debounce_ms == 0 {
            result.add_error(ValidationError::new(
                "watcher.debounce_ms",
                "debounce_ms must be greater than 0",
            ));
        }

        if config.watcher.debounce_ms > 5000 {
            result.add_warning(ValidationWarning::new(
                "watcher.debounce_ms",
                "debounce_ms is very high (>5000), change notifications will lag noticeably",
            ));
        }
    }

    fn validate_channel(config: &Config, result: &mut ValidationResult) {
        if config.channel.request_timeout_ms == Some(0) {
            result.add_error(ValidationError::new(
                "channel.request_timeout_ms",
                "request_timeout_ms must be greater than 0 when set",
            ));
        }
    }

    fn validate_relay(config: &Config, result: &mut ValidationResult) {
        if config.relay.poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "relay.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        }

        if config.relay.max_queue == 0 {
            result.add_error(ValidationError::new(
                "relay.max_queue",
                "max_queue must be greater than 0",
            ));
        }
    }

    fn validate_fetch(config: &Config, result: &mut ValidationResult) {
        if config.fetch.timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "fetch.timeout_secs",
                "timeout_secs must be greater than 0",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if !LOG_LEVELS.contains(&config.logging.level.to_lowercase().as_str()) {
            result.add_error(ValidationError::new(
                "logging.level",
                format!(
                    "Unknown log level '{}', valid values: {:?}",
                    config.logging.level, LOG_LEVELS
                ),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
