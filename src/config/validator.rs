use crate::config::Config;
use crate::error::{FightgraphError, Result, ValidationError};

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_schema_version(config, &mut errors);
        Self::validate_storage(config, &mut errors);
        Self::validate_rate_limit(config, &mut errors);
        Self::validate_cache(config, &mut errors);
        Self::validate_discovery(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(FightgraphError::ConfigValidation { errors })
        }
    }

    fn validate_schema_version(config: &Config, errors: &mut Vec<ValidationError>) {
        let version = &config.meta.schema_version;
        if version != "1.0.0" {
            errors.push(ValidationError::new(
                "_meta.schema_version",
                format!("Unsupported schema version: {}", version),
            ));
        }
    }

    fn validate_storage(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.storage.store_file.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.store_file",
                "Store file path cannot be empty",
            ));
        }
    }

    fn validate_rate_limit(config: &Config, errors: &mut Vec<ValidationError>) {
        let rl = &config.rate_limit;

        if rl.max_interval_ms < rl.min_interval_ms {
            errors.push(ValidationError::new(
                "rate_limit.max_interval_ms",
                format!(
                    "Max interval ({}ms) must not be below min interval ({}ms)",
                    rl.max_interval_ms, rl.min_interval_ms
                ),
            ));
        }

        if rl.adaptive {
            if rl.min_interval_ms == 0 {
                errors.push(ValidationError::new(
                    "rate_limit.min_interval_ms",
                    "Min interval must be greater than 0 when adaptive backoff is enabled",
                ));
            }
            if rl.burst_quota == 0 {
                errors.push(ValidationError::new(
                    "rate_limit.burst_quota",
                    "Burst quota must be greater than 0",
                ));
            }
            if rl.burst_window_ms == 0 {
                errors.push(ValidationError::new(
                    "rate_limit.burst_window_ms",
                    "Burst window must be greater than 0",
                ));
            }
        }
    }

    fn validate_cache(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.cache.enabled && config.cache.max_entries == 0 {
            errors.push(ValidationError::new(
                "cache.max_entries",
                "Max entries must be greater than 0 when the cache is enabled",
            ));
        }
    }

    fn validate_discovery(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.discovery.max_per_depth == Some(0) {
            errors.push(ValidationError::new(
                "discovery.max_per_depth",
                "Per-depth cap must be greater than 0 (omit it to disable)",
            ));
        }

        if config.discovery.expand_sample_size == 0 {
            errors.push(ValidationError::new(
                "discovery.expand_sample_size",
                "Expansion sample size must be greater than 0",
            ));
        }
    }
}
