// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Fully resolved configuration used at runtime.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::layer::{ConfigLayer, FetchLayer, LoggingLayer, ResolveLayer, RetryLayer};
use crate::paths::PathsConfig;
use crate::ConfigError;

pub const DEFAULT_CONTEXT_SIZE: usize = 3;
pub const DEFAULT_DEPENDENCY_MARKER: &str = "node_modules";
pub const DEFAULT_INSTRUMENTATION_MARKER: &str = "__stack_frame_overlay_proxy_console__";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration with every default applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedboxConfig {
	pub resolve: ResolveConfig,
	pub fetch: FetchConfig,
	pub retry: RetryConfig,
	pub logging: LoggingConfig,
	#[serde(skip)]
	pub paths: PathsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveConfig {
	/// Lines of source shown on each side of a frame.
	pub context_size: usize,
	pub dependency_marker: String,
	pub instrumentation_marker: String,
}

impl Default for ResolveConfig {
	fn default() -> Self {
		Self {
			context_size: DEFAULT_CONTEXT_SIZE,
			dependency_marker: DEFAULT_DEPENDENCY_MARKER.to_string(),
			instrumentation_marker: DEFAULT_INSTRUMENTATION_MARKER.to_string(),
		}
	}
}

/// Where bundles and source maps are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchConfig {
	/// Origin that relative bundle urls are fetched against.
	pub base_url: Option<String>,
	/// Build output directory; when set, urls are read from disk under it.
	pub root_dir: Option<PathBuf>,
	#[serde(with = "secs")]
	pub timeout: Duration,
}

impl Default for FetchConfig {
	fn default() -> Self {
		Self {
			base_url: None,
			root_dir: None,
			timeout: DEFAULT_FETCH_TIMEOUT,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
	pub max_attempts: u32,
	#[serde(with = "millis")]
	pub base_delay: Duration,
	#[serde(with = "millis")]
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
	pub level: LogLevel,
	pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	pub fn as_str(&self) -> &'static str {
		match self {
			LogLevel::Error => "error",
			LogLevel::Warn => "warn",
			LogLevel::Info => "info",
			LogLevel::Debug => "debug",
			LogLevel::Trace => "trace",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Pretty,
	Json,
	#[default]
	Compact,
}

mod secs {
	use serde::{Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(duration.as_secs())
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		Ok(Duration::from_secs(u64::deserialize(deserializer)?))
	}
}

mod millis {
	use serde::{Deserialize, Deserializer, Serializer};
	use std::time::Duration;

	pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(duration.as_millis() as u64)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		Ok(Duration::from_millis(u64::deserialize(deserializer)?))
	}
}

impl RedboxConfig {
	/// Build runtime config from a merged layer and paths.
	pub fn from_layer(layer: ConfigLayer, paths: PathsConfig) -> Result<Self, ConfigError> {
		Ok(Self {
			resolve: build_resolve_config(layer.resolve),
			fetch: build_fetch_config(layer.fetch),
			retry: build_retry_config(layer.retry),
			logging: build_logging_config(layer.logging)?,
			paths,
		})
	}
}

impl Default for RedboxConfig {
	fn default() -> Self {
		Self {
			resolve: ResolveConfig::default(),
			fetch: FetchConfig::default(),
			retry: RetryConfig::default(),
			logging: LoggingConfig::default(),
			paths: PathsConfig::default(),
		}
	}
}

fn build_resolve_config(layer: Option<ResolveLayer>) -> ResolveConfig {
	let layer = layer.unwrap_or_default();
	ResolveConfig {
		context_size: layer.context_size.unwrap_or(DEFAULT_CONTEXT_SIZE),
		dependency_marker: layer
			.dependency_marker
			.unwrap_or_else(|| DEFAULT_DEPENDENCY_MARKER.to_string()),
		instrumentation_marker: layer
			.instrumentation_marker
			.unwrap_or_else(|| DEFAULT_INSTRUMENTATION_MARKER.to_string()),
	}
}

fn build_fetch_config(layer: Option<FetchLayer>) -> FetchConfig {
	let layer = layer.unwrap_or_default();
	FetchConfig {
		base_url: layer.base_url,
		root_dir: layer.root_dir,
		timeout: layer
			.timeout_secs
			.map(Duration::from_secs)
			.unwrap_or(DEFAULT_FETCH_TIMEOUT),
	}
}

fn build_retry_config(layer: Option<RetryLayer>) -> RetryConfig {
	let layer = layer.unwrap_or_default();
	let defaults = RetryConfig::default();
	RetryConfig {
		max_attempts: layer.max_attempts.unwrap_or(defaults.max_attempts),
		base_delay: layer
			.base_delay_ms
			.map(Duration::from_millis)
			.unwrap_or(defaults.base_delay),
		max_delay: layer
			.max_delay_ms
			.map(Duration::from_millis)
			.unwrap_or(defaults.max_delay),
		backoff_factor: layer.backoff_factor.unwrap_or(defaults.backoff_factor),
		jitter: layer.jitter.unwrap_or(defaults.jitter),
	}
}

fn build_logging_config(layer: Option<LoggingLayer>) -> Result<LoggingConfig, ConfigError> {
	let layer = layer.unwrap_or_default();
	Ok(LoggingConfig {
		level: parse_log_level(layer.level.as_deref())?,
		format: parse_log_format(layer.format.as_deref())?,
	})
}

fn parse_log_level(s: Option<&str>) -> Result<LogLevel, ConfigError> {
	match s.map(str::to_ascii_lowercase).as_deref() {
		None => Ok(LogLevel::default()),
		Some("error") => Ok(LogLevel::Error),
		Some("warn") => Ok(LogLevel::Warn),
		Some("info") => Ok(LogLevel::Info),
		Some("debug") => Ok(LogLevel::Debug),
		Some("trace") => Ok(LogLevel::Trace),
		Some(other) => Err(ConfigError::invalid_value(
			"logging.level",
			format!("unknown level '{other}'"),
		)),
	}
}

fn parse_log_format(s: Option<&str>) -> Result<LogFormat, ConfigError> {
	match s.map(str::to_ascii_lowercase).as_deref() {
		None => Ok(LogFormat::default()),
		Some("json") => Ok(LogFormat::Json),
		Some("compact") => Ok(LogFormat::Compact),
		Some("pretty") => Ok(LogFormat::Pretty),
		Some(other) => Err(ConfigError::invalid_value(
			"logging.format",
			format!("unknown format '{other}'"),
		)),
	}
}
