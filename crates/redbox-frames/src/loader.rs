// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source map discovery, loading and caching.
//!
//! A bundle names its map with a trailing `//# sourceMappingURL=` directive.
//! The map is either inlined as a base64 `data:` URI or fetched from a URL
//! relative to the bundle. Loaded maps are cached per bundle URL, and
//! concurrent requests for the same bundle share one in-flight load.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use redbox_frames_symbolicate::SourceMapConsumer;
use regex::Regex;
use tracing::{debug, instrument};

use crate::error::{FramesError, Result};
use crate::fetch::{fetch_location, Fetcher};

static MAPPING_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"(?m)//[#@] ?sourceMappingURL=([^\s'"]+)\s*$"#).expect("directive regex is valid")
});

static BASE64_DATA_URI: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"^data:application/json;([\w=:"-]+;)*base64,"#).expect("data URI regex is valid")
});

/// A bundle together with its parsed source map.
#[derive(Debug)]
pub struct LoadedBundle {
	pub url: String,
	pub text: String,
	pub map: SourceMapConsumer,
}

/// Value of the last `sourceMappingURL` directive in `bundle_text`.
pub fn extract_source_map_url(bundle_text: &str) -> Option<&str> {
	MAPPING_DIRECTIVE
		.captures_iter(bundle_text)
		.last()
		.and_then(|caps| caps.get(1))
		.map(|m| m.as_str())
}

/// Location of an external map named by a bundle's directive.
///
/// An absolute bundle URL is joined with the reference, keeping its origin.
/// Otherwise absolute and root-relative references are used as is and
/// anything else is taken relative to the bundle's directory.
pub fn resolve_map_url(bundle_url: &str, map_url: &str) -> String {
	if let Ok(joined) = url::Url::parse(bundle_url).and_then(|base| base.join(map_url)) {
		return joined.into();
	}
	if map_url.starts_with('/') || url::Url::parse(map_url).is_ok() {
		return map_url.to_string();
	}
	let dir_end = bundle_url.rfind('/').map(|idx| idx + 1).unwrap_or(0);
	format!("{}{}", &bundle_url[..dir_end], map_url)
}

/// Decode an inline `data:` source map.
pub fn decode_inline_map(data_uri: &str) -> Result<String> {
	let header = BASE64_DATA_URI
		.find(data_uri)
		.ok_or(FramesError::UnsupportedEncoding)?;
	let payload = data_uri[header.end()..].trim();
	let bytes = STANDARD
		.decode(payload)
		.map_err(|e| FramesError::InvalidBase64(e.to_string()))?;
	String::from_utf8(bytes).map_err(|e| FramesError::InvalidBase64(e.to_string()))
}

/// Locate, retrieve and parse the source map for a bundle.
#[instrument(skip(fetcher, bundle_text), fields(bundle_bytes = bundle_text.len()))]
pub async fn load_source_map(
	fetcher: &dyn Fetcher,
	bundle_url: &str,
	bundle_text: &str,
) -> Result<SourceMapConsumer> {
	let directive = extract_source_map_url(bundle_text)
		.ok_or_else(|| FramesError::MapNotFound(bundle_url.to_string()))?;

	let (map_url, map_text) = if directive.starts_with("data:") {
		(bundle_url.to_string(), decode_inline_map(directive)?)
	} else {
		let map_url = resolve_map_url(bundle_url, directive);
		let text = fetcher
			.fetch_text(&map_url)
			.await
			.map_err(|e| FramesError::fetch(&map_url, e))?;
		(map_url, text)
	};

	let map: SourceMapConsumer = map_text
		.parse()
		.map_err(|e| FramesError::invalid_map(&map_url, e))?;
	debug!(
		map_url = %map_url,
		sources = map.source_count(),
		mappings = map.mapping_count(),
		"loaded source map"
	);
	Ok(map)
}

type LoadFuture = Shared<BoxFuture<'static, Result<Arc<LoadedBundle>>>>;

enum Slot {
	Pending(LoadFuture),
	Ready(Arc<LoadedBundle>),
}

/// Cache of loaded bundles keyed by URL, with single-flight loading.
///
/// A failed load is returned to every caller that was waiting on it and is
/// then forgotten, so a later call starts afresh.
pub struct SourceMapCache {
	fetcher: Arc<dyn Fetcher>,
	slots: Mutex<HashMap<String, Slot>>,
	known_bundles: Mutex<HashMap<String, String>>,
}

impl SourceMapCache {
	pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
		Self {
			fetcher,
			slots: Mutex::new(HashMap::new()),
			known_bundles: Mutex::new(HashMap::new()),
		}
	}

	/// Register the text of a bundle the host already holds.
	///
	/// Loads for `url` use this text instead of fetching the bundle.
	pub fn register_bundle(&self, url: impl Into<String>, text: impl Into<String>) {
		self.known_bundles.lock().insert(url.into(), text.into());
	}

	pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
		&self.fetcher
	}

	/// Load the bundle at `url` and its map.
	///
	/// `bundle_text`, or text registered with [`Self::register_bundle`], skips
	/// fetching the bundle itself.
	pub async fn load(&self, url: &str, bundle_text: Option<&str>) -> Result<Arc<LoadedBundle>> {
		let pending = {
			let mut slots = self.slots.lock();
			match slots.get(url) {
				Some(Slot::Ready(bundle)) => return Ok(Arc::clone(bundle)),
				Some(Slot::Pending(pending)) => {
					debug!(url, "joining in-flight source map load");
					pending.clone()
				}
				None => {
					let text = bundle_text
						.map(str::to_string)
						.or_else(|| self.known_bundles.lock().get(url).cloned());
					let pending = load_bundle(Arc::clone(&self.fetcher), url.to_string(), text)
						.boxed()
						.shared();
					slots.insert(url.to_string(), Slot::Pending(pending.clone()));
					pending
				}
			}
		};

		let result = pending.clone().await;

		let mut slots = self.slots.lock();
		let still_pending = matches!(
			slots.get(url),
			Some(Slot::Pending(current)) if current.ptr_eq(&pending)
		);
		if still_pending {
			match &result {
				Ok(bundle) => {
					slots.insert(url.to_string(), Slot::Ready(Arc::clone(bundle)));
				}
				Err(_) => {
					slots.remove(url);
				}
			}
		}

		result
	}

	/// A completed load for `url`, if any.
	pub fn get(&self, url: &str) -> Option<Arc<LoadedBundle>> {
		match self.slots.lock().get(url) {
			Some(Slot::Ready(bundle)) => Some(Arc::clone(bundle)),
			_ => None,
		}
	}

	/// Number of completed loads held.
	pub fn len(&self) -> usize {
		self.slots
			.lock()
			.values()
			.filter(|slot| matches!(slot, Slot::Ready(_)))
			.count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn clear(&self) {
		self.slots.lock().clear();
	}
}

async fn load_bundle(
	fetcher: Arc<dyn Fetcher>,
	url: String,
	bundle_text: Option<String>,
) -> Result<Arc<LoadedBundle>> {
	let text = match bundle_text {
		Some(text) => text,
		None => fetcher
			.fetch_text(&fetch_location(&url))
			.await
			.map_err(|e| FramesError::fetch(&url, e))?,
	};
	let map = load_source_map(fetcher.as_ref(), &url, &text).await?;
	Ok(Arc::new(LoadedBundle { url, text, map }))
}
