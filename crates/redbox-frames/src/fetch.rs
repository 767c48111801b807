// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retrieval of bundle and source map text.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use redbox_common_http::{retry, RetryConfig};
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::error::FetchError;

/// Scheme used by webpack for modules that only exist in the dev server.
const INTERNAL_SCHEME: &str = "webpack-internal:";

/// Dev server endpoint that serves `webpack-internal:` modules.
const INTERNAL_SOURCE_ENDPOINT: &str = "/__get-internal-source";

/// Source of bundle and map text, keyed by URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
	async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Location to fetch for a frame's file name.
///
/// `webpack-internal:` modules are served through the dev server's internal
/// source endpoint; every other name is fetched as is.
pub fn fetch_location(file_name: &str) -> Cow<'_, str> {
	if file_name.starts_with(INTERNAL_SCHEME) {
		Cow::Owned(format!(
			"{}?fileName={}",
			INTERNAL_SOURCE_ENDPOINT,
			urlencoding::encode(file_name)
		))
	} else {
		Cow::Borrowed(file_name)
	}
}

/// Fetches over HTTP, resolving relative locations against a base URL.
pub struct HttpFetcher {
	client: Client,
	base_url: Option<Url>,
	retry: RetryConfig,
}

impl HttpFetcher {
	pub fn new(client: Client) -> Self {
		Self {
			client,
			base_url: None,
			retry: RetryConfig::default(),
		}
	}

	/// Build a fetcher with the shared redbox client and a request timeout.
	pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
		Ok(Self::new(redbox_common_http::new_client_with_timeout(timeout)?))
	}

	pub fn base_url(mut self, base_url: Url) -> Self {
		self.base_url = Some(base_url);
		self
	}

	pub fn retry_config(mut self, retry: RetryConfig) -> Self {
		self.retry = retry;
		self
	}

	/// Absolute URL for `location`.
	pub fn resolve(&self, location: &str) -> Result<Url, FetchError> {
		match Url::parse(location) {
			Ok(url) => Ok(url),
			Err(url::ParseError::RelativeUrlWithoutBase) => {
				let base = self.base_url.as_ref().ok_or_else(|| FetchError::InvalidLocation {
					location: location.to_string(),
					reason: "relative location and no base URL configured".to_string(),
				})?;
				base.join(location).map_err(|e| FetchError::InvalidLocation {
					location: location.to_string(),
					reason: e.to_string(),
				})
			}
			Err(e) => Err(FetchError::InvalidLocation {
				location: location.to_string(),
				reason: e.to_string(),
			}),
		}
	}

	async fn fetch_once(&self, url: &Url) -> Result<String, FetchError> {
		let response = self.client.get(url.clone()).send().await?;
		let status = response.status();
		if !status.is_success() {
			return Err(FetchError::Status {
				url: url.to_string(),
				status: status.as_u16(),
			});
		}
		Ok(response.text().await?)
	}
}

#[async_trait]
impl Fetcher for HttpFetcher {
	#[instrument(skip(self))]
	async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
		let resolved = self.resolve(url)?;
		let text = retry(&self.retry, resolved.as_str(), || self.fetch_once(&resolved)).await?;
		debug!(bytes = text.len(), "fetched over HTTP");
		Ok(text)
	}
}

/// Reads files below a root directory, mapping URL paths to file paths.
#[derive(Debug, Clone)]
pub struct FileFetcher {
	root: PathBuf,
}

impl FileFetcher {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// File path for `location`, which may be a full URL or a bare path.
	///
	/// Query strings and fragments are ignored. Paths escaping the root are
	/// rejected.
	pub fn resolve(&self, location: &str) -> Result<PathBuf, FetchError> {
		let path = match Url::parse(location) {
			Ok(url) if url.scheme() == "file" => url
				.to_file_path()
				.map_err(|_| FetchError::InvalidLocation {
					location: location.to_string(),
					reason: "not a local file URL".to_string(),
				})?
				.to_string_lossy()
				.into_owned(),
			Ok(url) => urlencoding::decode(url.path())
				.map(Cow::into_owned)
				.unwrap_or_else(|_| url.path().to_string()),
			Err(_) => location
				.split(['?', '#'])
				.next()
				.unwrap_or_default()
				.to_string(),
		};

		let relative = Path::new(path.trim_start_matches('/'));
		if relative
			.components()
			.any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
		{
			return Err(FetchError::InvalidLocation {
				location: location.to_string(),
				reason: "path escapes the fetch root".to_string(),
			});
		}
		Ok(self.root.join(relative))
	}
}

#[async_trait]
impl Fetcher for FileFetcher {
	#[instrument(skip(self))]
	async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
		let path = self.resolve(url)?;
		let text = tokio::fs::read_to_string(&path)
			.await
			.map_err(|source| FetchError::Io {
				path: path.clone(),
				source,
			})?;
		debug!(path = %path.display(), bytes = text.len(), "read from disk");
		Ok(text)
	}
}

/// Serves registered texts and counts fetches per URL.
#[derive(Debug, Default)]
pub struct InMemoryFetcher {
	contents: Mutex<HashMap<String, String>>,
	fetches: Mutex<HashMap<String, usize>>,
	latency: Option<Duration>,
}

impl InMemoryFetcher {
	pub fn new() -> Self {
		Self::default()
	}

	/// Delay every fetch by `latency`.
	pub fn with_latency(mut self, latency: Duration) -> Self {
		self.latency = Some(latency);
		self
	}

	pub fn insert(&self, url: impl Into<String>, text: impl Into<String>) {
		self.contents.lock().insert(url.into(), text.into());
	}

	/// Number of fetches made for `url`, hits and misses alike.
	pub fn fetch_count(&self, url: &str) -> usize {
		self.fetches.lock().get(url).copied().unwrap_or(0)
	}

	pub fn total_fetches(&self) -> usize {
		self.fetches.lock().values().sum()
	}
}

#[async_trait]
impl Fetcher for InMemoryFetcher {
	async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
		*self.fetches.lock().entry(url.to_string()).or_insert(0) += 1;
		if let Some(latency) = self.latency {
			tokio::time::sleep(latency).await;
		}
		self.contents
			.lock()
			.get(url)
			.cloned()
			.ok_or_else(|| FetchError::NotFound(url.to_string()))
	}
}
