// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration validation rules.

use tracing::warn;

use crate::runtime::RedboxConfig;
use crate::ConfigError;

/// Validate the configuration.
pub fn validate_config(config: &RedboxConfig) -> Result<(), ConfigError> {
	validate_resolve(config)?;
	validate_fetch(config)?;
	validate_retry(config)?;

	Ok(())
}

fn validate_resolve(config: &RedboxConfig) -> Result<(), ConfigError> {
	let resolve = &config.resolve;

	if resolve.dependency_marker.is_empty() {
		return Err(ConfigError::invalid_value(
			"resolve.dependency_marker",
			"cannot be empty",
		));
	}

	if resolve.instrumentation_marker.is_empty() {
		return Err(ConfigError::invalid_value(
			"resolve.instrumentation_marker",
			"cannot be empty",
		));
	}

	Ok(())
}

fn validate_fetch(config: &RedboxConfig) -> Result<(), ConfigError> {
	let fetch = &config.fetch;

	if fetch.timeout.is_zero() {
		return Err(ConfigError::invalid_value(
			"fetch.timeout_secs",
			"must be at least 1",
		));
	}

	if let Some(base_url) = &fetch.base_url {
		if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
			return Err(ConfigError::invalid_value(
				"fetch.base_url",
				"must be an http or https url",
			));
		}
	}

	if fetch.base_url.is_some() && fetch.root_dir.is_some() {
		warn!("both fetch.base_url and fetch.root_dir are set, root_dir wins");
	}

	Ok(())
}

fn validate_retry(config: &RedboxConfig) -> Result<(), ConfigError> {
	let retry = &config.retry;

	if retry.max_attempts == 0 {
		return Err(ConfigError::invalid_value(
			"retry.max_attempts",
			"must be at least 1",
		));
	}

	if retry.max_attempts > 20 {
		return Err(ConfigError::invalid_value(
			"retry.max_attempts",
			"must be at most 20 (unreasonably high)",
		));
	}

	if retry.backoff_factor < 1.0 {
		return Err(ConfigError::invalid_value(
			"retry.backoff_factor",
			"must be at least 1.0",
		));
	}

	if retry.base_delay > retry.max_delay {
		return Err(ConfigError::invalid_value(
			"retry.base_delay",
			"cannot be greater than max_delay",
		));
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[test]
	fn test_default_config_is_valid() {
		assert!(validate_config(&RedboxConfig::default()).is_ok());
	}

	#[test]
	fn test_zero_max_attempts_fails() {
		let mut config = RedboxConfig::default();
		config.retry.max_attempts = 0;

		let err = validate_config(&config).unwrap_err();
		assert!(err.to_string().contains("retry.max_attempts"));
	}

	#[test]
	fn test_base_delay_above_max_fails() {
		let mut config = RedboxConfig::default();
		config.retry.base_delay = Duration::from_secs(10);
		config.retry.max_delay = Duration::from_secs(1);

		assert!(validate_config(&config).is_err());
	}

	#[test]
	fn test_empty_markers_fail() {
		let mut config = RedboxConfig::default();
		config.resolve.dependency_marker.clear();
		assert!(validate_config(&config).is_err());

		let mut config = RedboxConfig::default();
		config.resolve.instrumentation_marker.clear();
		assert!(validate_config(&config).is_err());
	}

	#[test]
	fn test_base_url_must_be_http() {
		let mut config = RedboxConfig::default();
		config.fetch.base_url = Some("ftp://example.com/".to_string());
		assert!(validate_config(&config).is_err());

		config.fetch.base_url = Some("http://localhost:3000/".to_string());
		assert!(validate_config(&config).is_ok());
	}

	#[test]
	fn test_zero_timeout_fails() {
		let mut config = RedboxConfig::default();
		config.fetch.timeout = Duration::ZERO;
		assert!(validate_config(&config).is_err());
	}
}
