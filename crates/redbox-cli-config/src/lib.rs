// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration management for the redbox command line.
//!
//! This crate provides:
//! - XDG Base Directory compliant path resolution
//! - Layered configuration from multiple sources
//! - TOML configuration file parsing
//! - Environment variable overrides
//! - Configuration validation

pub mod error;
pub mod layer;
pub mod paths;
pub mod registry;
pub mod runtime;
pub mod sources;
pub mod validation;

pub use error::ConfigError;
pub use layer::ConfigLayer;
pub use paths::PathsConfig;
pub use registry::ConfigRegistry;
pub use runtime::{
	FetchConfig, LogFormat, LogLevel, LoggingConfig, RedboxConfig, ResolveConfig, RetryConfig,
};
pub use sources::{CliOverrides, ConfigSource, Precedence};

/// Load configuration from all sources with default precedence.
pub fn load_config() -> Result<RedboxConfig, ConfigError> {
	load_config_with_cli(CliOverrides::default())
}

/// Load configuration with CLI overrides.
///
/// An explicit `config_file` must exist; it ranks above the workspace file
/// and below the environment.
pub fn load_config_with_cli(cli: CliOverrides) -> Result<RedboxConfig, ConfigError> {
	let paths = paths::resolve_xdg_paths()?;

	let mut registry = ConfigRegistry::new();

	registry.register(Box::new(sources::DefaultsSource));
	registry.register(Box::new(sources::FileSource::user(&paths)));
	if let Ok(ws) = sources::FileSource::workspace() {
		registry.register(Box::new(ws));
	}
	if let Some(path) = cli.config_file.clone() {
		registry.register(Box::new(sources::FileSource::explicit(path)));
	}
	registry.register(Box::new(sources::EnvSource));
	registry.register(Box::new(sources::CliSource::new(cli)));

	registry.load(paths)
}
