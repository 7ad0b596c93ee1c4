// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes.
//! All failures are collected rather than stopping at the first.

use crate::diagnostic::ConfigError;
use crate::model::{parse_utc_offset, MnemoConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &MnemoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::invalid("server.host", "must not be empty"));
    }
    if !LOG_LEVELS.contains(&config.server.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::invalid(
            "server.log_level",
            format!(
                "must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.server.log_level
            ),
        ));
    }
    if config
        .server
        .bearer_token
        .as_deref()
        .is_some_and(|t| t.trim().is_empty())
    {
        errors.push(ConfigError::invalid(
            "server.bearer_token",
            "must not be empty when set",
        ));
    }

    check_url(&mut errors, "vector.url", &config.vector.url);
    if config.vector.collection.trim().is_empty() {
        errors.push(ConfigError::invalid("vector.collection", "must not be empty"));
    }
    check_nonzero(&mut errors, "vector.timeout_secs", config.vector.timeout_secs);

    check_url(&mut errors, "embedding.url", &config.embedding.url);
    check_nonzero(&mut errors, "embedding.dimensions", config.embedding.dimensions as u64);
    check_nonzero(&mut errors, "embedding.timeout_secs", config.embedding.timeout_secs);
    if config.embedding.model.trim().is_empty() {
        errors.push(ConfigError::invalid("embedding.model", "must not be empty"));
    }

    let memory = &config.memory;
    if parse_utc_offset(&memory.utc_offset).is_none() {
        errors.push(ConfigError::invalid(
            "memory.utc_offset",
            format!("must look like `+HH:MM` or `-HH:MM`, got `{}`", memory.utc_offset),
        ));
    }
    check_nonzero(&mut errors, "memory.default_search_limit", memory.default_search_limit as u64);
    check_nonzero(&mut errors, "memory.default_history_limit", memory.default_history_limit as u64);
    check_nonzero(&mut errors, "memory.stats_interval_secs", memory.stats_interval_secs);
    check_nonzero(&mut errors, "memory.stats_history_len", memory.stats_history_len as u64);
    check_nonzero(&mut errors, "memory.activity_log_len", memory.activity_log_len as u64);

    check_nonzero(&mut errors, "indexer.max_file_bytes", config.indexer.max_file_bytes);
    check_nonzero(&mut errors, "indexer.watch_interval_secs", config.indexer.watch_interval_secs);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_nonzero(errors: &mut Vec<ConfigError>, key: &str, value: u64) {
    if value == 0 {
        errors.push(ConfigError::invalid(key, "must be greater than 0"));
    }
}

fn check_url(errors: &mut Vec<ConfigError>, key: &str, url: &str) {
    let url = url.trim();
    if url.is_empty() {
        errors.push(ConfigError::invalid(key, "must not be empty"));
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(ConfigError::invalid(
            key,
            format!("must start with http:// or https://, got `{url}`"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&MnemoConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_failure() {
        let mut config = MnemoConfig::default();
        config.vector.collection = " ".into();
        config.embedding.dimensions = 0;
        config.memory.utc_offset = "nowhere".into();
        config.indexer.max_file_bytes = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "{errors:?}");
        let text: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        assert!(text.iter().any(|e| e.contains("vector.collection")));
        assert!(text.iter().any(|e| e.contains("memory.utc_offset")));
    }

    #[test]
    fn rejects_non_http_urls() {
        let mut config = MnemoConfig::default();
        config.vector.url = "localhost:6333".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("http://"));
    }
}
