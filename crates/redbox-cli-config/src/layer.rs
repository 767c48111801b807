// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration as read from a single source.
//!
//! Every field is optional so that layers from different sources can be
//! merged, with later layers overriding the fields they set.

use std::path::PathBuf;

use serde::Deserialize;

/// One source's view of the configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigLayer {
	#[serde(default)]
	pub resolve: Option<ResolveLayer>,
	#[serde(default)]
	pub fetch: Option<FetchLayer>,
	#[serde(default)]
	pub retry: Option<RetryLayer>,
	#[serde(default)]
	pub logging: Option<LoggingLayer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolveLayer {
	#[serde(default)]
	pub context_size: Option<usize>,
	#[serde(default)]
	pub dependency_marker: Option<String>,
	#[serde(default)]
	pub instrumentation_marker: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FetchLayer {
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub root_dir: Option<PathBuf>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryLayer {
	#[serde(default)]
	pub max_attempts: Option<u32>,
	#[serde(default)]
	pub base_delay_ms: Option<u64>,
	#[serde(default)]
	pub max_delay_ms: Option<u64>,
	#[serde(default)]
	pub backoff_factor: Option<f64>,
	#[serde(default)]
	pub jitter: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingLayer {
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub format: Option<String>,
}

impl ConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: ConfigLayer) {
		merge_option(&mut self.resolve, other.resolve, ResolveLayer::merge);
		merge_option(&mut self.fetch, other.fetch, FetchLayer::merge);
		merge_option(&mut self.retry, other.retry, RetryLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingLayer::merge);
	}
}

fn merge_option<T, F>(target: &mut Option<T>, source: Option<T>, merge_fn: F)
where
	F: FnOnce(&mut T, T),
{
	match (target.as_mut(), source) {
		(Some(t), Some(s)) => merge_fn(t, s),
		(None, Some(s)) => *target = Some(s),
		_ => {}
	}
}

fn take<T>(target: &mut Option<T>, source: Option<T>) {
	if source.is_some() {
		*target = source;
	}
}

impl ResolveLayer {
	fn merge(&mut self, other: ResolveLayer) {
		take(&mut self.context_size, other.context_size);
		take(&mut self.dependency_marker, other.dependency_marker);
		take(&mut self.instrumentation_marker, other.instrumentation_marker);
	}
}

impl FetchLayer {
	fn merge(&mut self, other: FetchLayer) {
		take(&mut self.base_url, other.base_url);
		take(&mut self.root_dir, other.root_dir);
		take(&mut self.timeout_secs, other.timeout_secs);
	}
}

impl RetryLayer {
	fn merge(&mut self, other: RetryLayer) {
		take(&mut self.max_attempts, other.max_attempts);
		take(&mut self.base_delay_ms, other.base_delay_ms);
		take(&mut self.max_delay_ms, other.max_delay_ms);
		take(&mut self.backoff_factor, other.backoff_factor);
		take(&mut self.jitter, other.jitter);
	}
}

impl LoggingLayer {
	fn merge(&mut self, other: LoggingLayer) {
		take(&mut self.level, other.level);
		take(&mut self.format, other.format);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn test_parse_partial_toml() {
		let layer: ConfigLayer = toml::from_str(
			r#"
[resolve]
context_size = 5

[fetch]
base_url = "http://localhost:3000/"
"#,
		)
		.unwrap();

		assert_eq!(layer.resolve.as_ref().unwrap().context_size, Some(5));
		assert!(layer.resolve.as_ref().unwrap().dependency_marker.is_none());
		assert_eq!(
			layer.fetch.unwrap().base_url.as_deref(),
			Some("http://localhost:3000/")
		);
		assert!(layer.retry.is_none());
	}

	#[test]
	fn test_merge_keeps_unset_fields() {
		let mut base: ConfigLayer = toml::from_str(
			r#"
[resolve]
context_size = 5
dependency_marker = "vendor"
"#,
		)
		.unwrap();
		let over: ConfigLayer = toml::from_str(
			r#"
[resolve]
context_size = 1

[logging]
level = "debug"
"#,
		)
		.unwrap();

		base.merge(over);

		let resolve = base.resolve.unwrap();
		assert_eq!(resolve.context_size, Some(1));
		assert_eq!(resolve.dependency_marker.as_deref(), Some("vendor"));
		assert_eq!(base.logging.unwrap().level.as_deref(), Some("debug"));
	}

	proptest! {
		/// The later layer wins whenever it sets a value.
		#[test]
		fn merge_prefers_later_values(a in proptest::option::of(0usize..100), b in proptest::option::of(0usize..100)) {
			let mut base = ConfigLayer {
				resolve: Some(ResolveLayer { context_size: a, ..Default::default() }),
				..Default::default()
			};
			base.merge(ConfigLayer {
				resolve: Some(ResolveLayer { context_size: b, ..Default::default() }),
				..Default::default()
			});
			prop_assert_eq!(base.resolve.unwrap().context_size, b.or(a));
		}
	}
}
