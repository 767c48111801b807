// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: files, environment, CLI, defaults.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace, warn};

use crate::layer::*;
use crate::paths::{PathsConfig, WORKSPACE_CONFIG_FILE};
use crate::ConfigError;

/// Prefix of the environment variables read by [`EnvSource`].
pub const ENV_PREFIX: &str = "REDBOX_";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	UserFile = 30,
	WorkspaceFile = 40,
	ExplicitFile = 45,
	Environment = 50,
	Cli = 60,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	/// Name for logging
	fn name(&self) -> &'static str;

	/// Precedence level
	fn precedence(&self) -> Precedence;

	/// Load configuration layer from this source
	fn load(&self) -> Result<ConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading defaults");
		// Defaults are applied when the runtime config is built
		Ok(ConfigLayer::default())
	}
}

/// File-based configuration source (TOML).
pub struct FileSource {
	path: PathBuf,
	precedence: Precedence,
	name: &'static str,
	required: bool,
}

impl FileSource {
	/// User config: ~/.config/redbox/config.toml
	pub fn user(paths: &PathsConfig) -> Self {
		Self {
			path: paths.user_config_file.clone(),
			precedence: Precedence::UserFile,
			name: "user-config",
			required: false,
		}
	}

	/// Workspace config: .redbox/config.toml
	pub fn workspace() -> Result<Self, ConfigError> {
		let cwd = std::env::current_dir()?;
		Ok(Self {
			path: cwd.join(WORKSPACE_CONFIG_FILE),
			precedence: Precedence::WorkspaceFile,
			name: "workspace-config",
			required: false,
		})
	}

	/// Custom file path with specified precedence
	pub fn custom(path: PathBuf, precedence: Precedence, name: &'static str) -> Self {
		Self {
			path,
			precedence,
			name,
			required: false,
		}
	}

	/// File named explicitly by the user; a missing file is an error.
	pub fn explicit(path: PathBuf) -> Self {
		Self {
			path,
			precedence: Precedence::ExplicitFile,
			name: "explicit-config",
			required: true,
		}
	}

	pub fn path(&self) -> &PathBuf {
		&self.path
	}
}

impl ConfigSource for FileSource {
	fn name(&self) -> &'static str {
		self.name
	}
	fn precedence(&self) -> Precedence {
		self.precedence
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		if !self.path.exists() {
			if self.required {
				return Err(ConfigError::FileNotFound(self.path.clone()));
			}
			debug!(path = %self.path.display(), source = self.name, "config file not found, skipping");
			return Ok(ConfigLayer::default());
		}

		debug!(path = %self.path.display(), source = self.name, "loading config file");

		let content = std::fs::read_to_string(&self.path)?;
		let layer: ConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!(source = self.name, "parsed config layer");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: REDBOX_<FIELD>, e.g. `REDBOX_CONTEXT_SIZE` or
/// `REDBOX_RETRY_MAX_ATTEMPTS`. Unknown variables are ignored; values that do
/// not parse are logged and skipped.
pub struct EnvSource;

impl EnvSource {
	/// Build a layer from the given variables instead of the process
	/// environment.
	pub fn load_from<I, K, V>(vars: I) -> ConfigLayer
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		let mut layer = ConfigLayer::default();

		for (key, value) in vars {
			let key = key.as_ref();
			if !key.starts_with(ENV_PREFIX) {
				continue;
			}

			let value = value.as_ref().trim();
			if value.is_empty() {
				continue;
			}

			trace!(key = %key, "processing env var");

			match key {
				"REDBOX_CONTEXT_SIZE" => {
					if let Some(v) = parse_env(key, value) {
						resolve(&mut layer).context_size = Some(v);
					}
				}
				"REDBOX_DEPENDENCY_MARKER" => {
					resolve(&mut layer).dependency_marker = Some(value.to_string());
				}
				"REDBOX_INSTRUMENTATION_MARKER" => {
					resolve(&mut layer).instrumentation_marker = Some(value.to_string());
				}

				"REDBOX_BASE_URL" => {
					fetch(&mut layer).base_url = Some(value.to_string());
				}
				"REDBOX_ROOT_DIR" => {
					fetch(&mut layer).root_dir = Some(PathBuf::from(value));
				}
				"REDBOX_FETCH_TIMEOUT_SECS" => {
					if let Some(v) = parse_env(key, value) {
						fetch(&mut layer).timeout_secs = Some(v);
					}
				}

				"REDBOX_RETRY_MAX_ATTEMPTS" => {
					if let Some(v) = parse_env(key, value) {
						retry(&mut layer).max_attempts = Some(v);
					}
				}
				"REDBOX_RETRY_BASE_DELAY_MS" => {
					if let Some(v) = parse_env(key, value) {
						retry(&mut layer).base_delay_ms = Some(v);
					}
				}
				"REDBOX_RETRY_MAX_DELAY_MS" => {
					if let Some(v) = parse_env(key, value) {
						retry(&mut layer).max_delay_ms = Some(v);
					}
				}

				"REDBOX_LOG_LEVEL" => {
					logging(&mut layer).level = Some(value.to_string());
				}
				"REDBOX_LOG_FORMAT" => {
					logging(&mut layer).format = Some(value.to_string());
				}

				_ => {
					// Unknown REDBOX_ variable, ignore
				}
			}
		}

		layer
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(Self::load_from(std::env::vars()))
	}
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Option<T> {
	match value.parse() {
		Ok(v) => Some(v),
		Err(_) => {
			warn!(key = %key, value = %value, "ignoring unparseable environment variable");
			None
		}
	}
}

fn resolve(layer: &mut ConfigLayer) -> &mut ResolveLayer {
	layer.resolve.get_or_insert_with(ResolveLayer::default)
}

fn fetch(layer: &mut ConfigLayer) -> &mut FetchLayer {
	layer.fetch.get_or_insert_with(FetchLayer::default)
}

fn retry(layer: &mut ConfigLayer) -> &mut RetryLayer {
	layer.retry.get_or_insert_with(RetryLayer::default)
}

fn logging(layer: &mut ConfigLayer) -> &mut LoggingLayer {
	layer.logging.get_or_insert_with(LoggingLayer::default)
}

/// CLI override source.
pub struct CliSource {
	overrides: CliOverrides,
}

/// CLI argument overrides.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
	pub context_size: Option<usize>,
	pub base_url: Option<String>,
	pub root_dir: Option<PathBuf>,
	pub log_level: Option<String>,
	pub log_format: Option<String>,
	pub config_file: Option<PathBuf>,
}

impl CliSource {
	pub fn new(overrides: CliOverrides) -> Self {
		Self { overrides }
	}
}

impl ConfigSource for CliSource {
	fn name(&self) -> &'static str {
		"cli"
	}
	fn precedence(&self) -> Precedence {
		Precedence::Cli
	}

	fn load(&self) -> Result<ConfigLayer, ConfigError> {
		debug!("loading CLI overrides");
		let mut layer = ConfigLayer::default();
		let overrides = &self.overrides;

		if let Some(context_size) = overrides.context_size {
			resolve(&mut layer).context_size = Some(context_size);
		}
		if let Some(ref base_url) = overrides.base_url {
			fetch(&mut layer).base_url = Some(base_url.clone());
		}
		if let Some(ref root_dir) = overrides.root_dir {
			fetch(&mut layer).root_dir = Some(root_dir.clone());
		}
		if let Some(ref level) = overrides.log_level {
			logging(&mut layer).level = Some(level.clone());
		}
		if let Some(ref format) = overrides.log_format {
			logging(&mut layer).format = Some(format.clone());
		}

		Ok(layer)
	}
}
