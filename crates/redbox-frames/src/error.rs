// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for frame resolution.

use std::path::PathBuf;
use std::sync::Arc;

use redbox_common_http::{is_retryable_status, RetryableError};
use redbox_frames_symbolicate::SymbolicateError;
use thiserror::Error;

/// Result type alias for frame resolution.
pub type Result<T> = std::result::Result<T, FramesError>;

/// Message reported for inline maps that are not base64 encoded.
pub const UNSUPPORTED_ENCODING_MESSAGE: &str =
	"Sorry, non-base64 inline source-map encoding is not supported.";

/// Errors from loading a bundle's source map.
///
/// Cloneable so a single failed load can be handed to every waiter.
#[derive(Debug, Clone, Error)]
pub enum FramesError {
	/// The bundle carries no `sourceMappingURL` directive.
	#[error("no source map directive found in {0}")]
	MapNotFound(String),

	/// An inline `data:` map uses an encoding other than base64.
	#[error("{}", UNSUPPORTED_ENCODING_MESSAGE)]
	UnsupportedEncoding,

	/// The bundle or its map could not be retrieved.
	#[error("failed to fetch {url}: {source}")]
	Fetch {
		url: String,
		#[source]
		source: Arc<FetchError>,
	},

	/// The map was retrieved but is not valid Source Map v3 JSON.
	#[error("invalid source map for {url}: {source}")]
	InvalidSourceMap {
		url: String,
		#[source]
		source: Arc<SymbolicateError>,
	},

	/// An inline map payload is not valid base64 or UTF-8.
	#[error("invalid inline source map payload: {0}")]
	InvalidBase64(String),
}

impl FramesError {
	/// Whether this error must abort the whole resolution call.
	///
	/// Every other error leaves the affected frames unresolved.
	pub fn is_fatal(&self) -> bool {
		matches!(self, FramesError::UnsupportedEncoding)
	}

	pub(crate) fn fetch(url: impl Into<String>, source: FetchError) -> Self {
		FramesError::Fetch {
			url: url.into(),
			source: Arc::new(source),
		}
	}

	pub(crate) fn invalid_map(url: impl Into<String>, source: SymbolicateError) -> Self {
		FramesError::InvalidSourceMap {
			url: url.into(),
			source: Arc::new(source),
		}
	}
}

/// Transport errors raised by a [`crate::Fetcher`].
#[derive(Debug, Error)]
pub enum FetchError {
	/// HTTP request failed.
	#[error("HTTP request failed: {0}")]
	Request(#[from] reqwest::Error),

	/// Server answered with a non-success status.
	#[error("server returned status {status} for {url}")]
	Status { url: String, status: u16 },

	/// Reading a local file failed.
	#[error("failed to read {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// The location cannot be turned into a fetchable URL or path.
	#[error("invalid location {location}: {reason}")]
	InvalidLocation { location: String, reason: String },

	/// Nothing is registered under the URL.
	#[error("no content registered for {0}")]
	NotFound(String),
}

impl RetryableError for FetchError {
	fn is_retryable(&self) -> bool {
		match self {
			FetchError::Request(err) => err.is_retryable(),
			FetchError::Status { status, .. } => reqwest::StatusCode::from_u16(*status)
				.map(is_retryable_status)
				.unwrap_or(false),
			FetchError::Io { .. } | FetchError::InvalidLocation { .. } | FetchError::NotFound(_) => {
				false
			}
		}
	}
}
