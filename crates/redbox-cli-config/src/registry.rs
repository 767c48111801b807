// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration registry - manages sources and merges layers.

use tracing::{debug, info};

use crate::layer::ConfigLayer;
use crate::paths::PathsConfig;
use crate::runtime::RedboxConfig;
use crate::sources::ConfigSource;
use crate::validation::validate_config;
use crate::ConfigError;

/// Registry that manages configuration sources and merges them.
pub struct ConfigRegistry {
	sources: Vec<Box<dyn ConfigSource>>,
}

impl ConfigRegistry {
	/// Create a new empty registry.
	pub fn new() -> Self {
		Self {
			sources: Vec::new(),
		}
	}

	/// Register a configuration source.
	pub fn register(&mut self, source: Box<dyn ConfigSource>) {
		debug!(source = source.name(), precedence = ?source.precedence(), "registering config source");
		self.sources.push(source);
	}

	/// Load configuration from all sources, merge, and validate.
	///
	/// Sources are sorted by precedence (lowest first) and merged
	/// so higher precedence sources override lower ones. A source that
	/// fails to load is an error, except that missing files load as empty.
	pub fn load(&self, paths: PathsConfig) -> Result<RedboxConfig, ConfigError> {
		let mut sorted_sources: Vec<_> = self.sources.iter().collect();
		sorted_sources.sort_by_key(|s| s.precedence());

		info!(
			source_count = sorted_sources.len(),
			"loading configuration from sources"
		);

		let mut merged = ConfigLayer::default();
		for source in &sorted_sources {
			let layer = source.load()?;
			debug!(source = source.name(), "merging config layer");
			merged.merge(layer);
		}

		let config = RedboxConfig::from_layer(merged, paths)?;
		validate_config(&config)?;

		info!(
			context_size = config.resolve.context_size,
			base_url = ?config.fetch.base_url,
			root_dir = ?config.fetch.root_dir,
			log_level = ?config.logging.level,
			"configuration loaded successfully"
		);

		Ok(config)
	}

	/// Get the number of registered sources.
	pub fn source_count(&self) -> usize {
		self.sources.len()
	}
}

impl Default for ConfigRegistry {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use std::io::Write;

	use super::*;
	use crate::layer::ResolveLayer;
	use crate::sources::{DefaultsSource, FileSource, Precedence};

	struct MockSource {
		name: &'static str,
		precedence: Precedence,
		context_size: usize,
	}

	impl ConfigSource for MockSource {
		fn name(&self) -> &'static str {
			self.name
		}
		fn precedence(&self) -> Precedence {
			self.precedence
		}

		fn load(&self) -> Result<ConfigLayer, ConfigError> {
			Ok(ConfigLayer {
				resolve: Some(ResolveLayer {
					context_size: Some(self.context_size),
					..Default::default()
				}),
				..Default::default()
			})
		}
	}

	#[test]
	fn test_registry_registers_sources() {
		let mut registry = ConfigRegistry::new();
		assert_eq!(registry.source_count(), 0);

		registry.register(Box::new(DefaultsSource));
		assert_eq!(registry.source_count(), 1);
	}

	#[test]
	fn test_registry_loads_with_defaults() {
		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(DefaultsSource));

		let config = registry.load(PathsConfig::default()).unwrap();
		assert_eq!(config.resolve.context_size, 3);
	}

	/// Test that sources are merged in precedence order.
	#[test]
	fn test_precedence_merge_order() {
		let mut registry = ConfigRegistry::new();

		// Registered in the wrong order, the registry sorts them
		registry.register(Box::new(MockSource {
			name: "cli",
			precedence: Precedence::Cli,
			context_size: 9,
		}));
		registry.register(Box::new(MockSource {
			name: "user",
			precedence: Precedence::UserFile,
			context_size: 1,
		}));

		let config = registry.load(PathsConfig::default()).unwrap();
		assert_eq!(config.resolve.context_size, 9);
	}

	#[test]
	fn test_workspace_file_overrides_user_file() {
		let dir = tempfile::tempdir().unwrap();
		let user = dir.path().join("user.toml");
		let workspace = dir.path().join("workspace.toml");
		writeln!(
			std::fs::File::create(&user).unwrap(),
			"[resolve]\ncontext_size = 8\ndependency_marker = \"vendor\""
		)
		.unwrap();
		writeln!(
			std::fs::File::create(&workspace).unwrap(),
			"[resolve]\ncontext_size = 2"
		)
		.unwrap();

		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(FileSource::custom(
			workspace,
			Precedence::WorkspaceFile,
			"workspace",
		)));
		registry.register(Box::new(FileSource::custom(user, Precedence::UserFile, "user")));

		let config = registry.load(PathsConfig::default()).unwrap();
		assert_eq!(config.resolve.context_size, 2);
		assert_eq!(config.resolve.dependency_marker, "vendor");
	}

	#[test]
	fn test_invalid_merged_config_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		std::fs::write(&path, "[retry]\nmax_attempts = 0\n").unwrap();

		let mut registry = ConfigRegistry::new();
		registry.register(Box::new(FileSource::custom(path, Precedence::UserFile, "user")));

		assert!(matches!(
			registry.load(PathsConfig::default()),
			Err(ConfigError::InvalidValue { .. })
		));
	}
}
