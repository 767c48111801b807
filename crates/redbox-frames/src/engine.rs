// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack frame resolution for captured errors.

use std::sync::Arc;

use redbox_frames_core::{CapturedError, StackFrame};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::fetch::Fetcher;
use crate::loader::SourceMapCache;
use crate::parser::parse;
use crate::resolver::{Pathway, Resolver, DEFAULT_CONTEXT_SIZE};

/// Marker for frames inside installed dependencies.
pub const DEFAULT_DEPENDENCY_MARKER: &str = "node_modules";

/// Function name marker of the console proxy installed by error capture.
pub const DEFAULT_INSTRUMENTATION_MARKER: &str = "__stack_frame_overlay_proxy_console__";

/// Rules deciding which resolved frames are worth showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressionRules {
	/// Original file names containing this are dependency code.
	pub dependency_marker: String,
	/// Function names containing this belong to the capture machinery.
	pub instrumentation_marker: String,
}

impl Default for SuppressionRules {
	fn default() -> Self {
		Self {
			dependency_marker: DEFAULT_DEPENDENCY_MARKER.to_string(),
			instrumentation_marker: DEFAULT_INSTRUMENTATION_MARKER.to_string(),
		}
	}
}

impl SuppressionRules {
	/// Filter resolved frames for display.
	///
	/// Returns `None` when no frame resolves to application code, otherwise
	/// the frames minus those belonging to the capture machinery.
	pub fn apply(&self, frames: Vec<StackFrame>) -> Option<Vec<StackFrame>> {
		let has_app_frame = frames.iter().any(|frame| {
			frame
				.original_file_name
				.as_deref()
				.is_some_and(|file| !file.contains(self.dependency_marker.as_str()))
		});
		if !has_app_frame {
			return None;
		}

		Some(
			frames
				.into_iter()
				.filter(|frame| {
					!frame
						.function_name
						.as_deref()
						.is_some_and(|name| name.contains(self.instrumentation_marker.as_str()))
				})
				.collect(),
		)
	}
}

/// Parses, resolves and filters the stack frames of captured errors.
///
/// Owns the source map cache, so maps loaded for one error are reused for
/// the next.
pub struct FrameEngine {
	cache: SourceMapCache,
	context_size: usize,
	suppression: SuppressionRules,
}

impl FrameEngine {
	pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
		Self::builder(fetcher).build()
	}

	pub fn builder(fetcher: Arc<dyn Fetcher>) -> FrameEngineBuilder {
		FrameEngineBuilder::new(fetcher)
	}

	/// Register the text of a bundle the host already holds.
	pub fn register_bundle(&self, url: impl Into<String>, text: impl Into<String>) {
		self.cache.register_bundle(url, text);
	}

	pub fn cache(&self) -> &SourceMapCache {
		&self.cache
	}

	/// Default context size for callers without their own.
	pub fn context_size(&self) -> usize {
		self.context_size
	}

	pub fn suppression(&self) -> &SuppressionRules {
		&self.suppression
	}

	/// Resolve the frames of `error` for display.
	///
	/// Errors carrying an unmap source are resolved against that bundle as
	/// original positions; all others as compiled positions. Returns
	/// `Ok(None)` when nothing is worth showing.
	#[instrument(skip(self, error), fields(message = %error.message, unmap = error.unmap_source.is_some()))]
	pub async fn get_stack_frames(
		&self,
		error: &CapturedError,
		unhandled_rejection: bool,
		context_size: usize,
	) -> Result<Option<Vec<StackFrame>>> {
		let frames: Vec<StackFrame> = parse(error.stack_text())
			.into_iter()
			.map(StackFrame::from)
			.collect();
		debug!(parsed = frames.len(), "parsed stack");

		let resolved = self
			.resolve_frames(frames, error.unmap_source.as_deref(), context_size)
			.await?;
		let total = resolved.len();

		let visible = self.suppression.apply(resolved);
		match &visible {
			Some(frames) => info!(total, shown = frames.len(), "resolved stack frames"),
			None => info!(total, "no application frames, suppressing error"),
		}
		Ok(visible)
	}

	/// Resolve already-parsed frames without applying suppression.
	pub async fn resolve_frames(
		&self,
		frames: Vec<StackFrame>,
		unmap_source: Option<&str>,
		context_size: usize,
	) -> Result<Vec<StackFrame>> {
		let pathway = match unmap_source {
			Some(bundle_url) => Pathway::Unmap {
				bundle_url,
				bundle_text: None,
			},
			None => Pathway::Map,
		};
		Resolver::new(&self.cache)
			.context_size(context_size)
			.resolve(frames, pathway)
			.await
	}
}

/// Builder for [`FrameEngine`].
pub struct FrameEngineBuilder {
	fetcher: Arc<dyn Fetcher>,
	context_size: usize,
	suppression: SuppressionRules,
	bundles: Vec<(String, String)>,
}

impl FrameEngineBuilder {
	pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
		Self {
			fetcher,
			context_size: DEFAULT_CONTEXT_SIZE,
			suppression: SuppressionRules::default(),
			bundles: Vec::new(),
		}
	}

	pub fn context_size(mut self, context_size: usize) -> Self {
		self.context_size = context_size;
		self
	}

	pub fn suppression(mut self, suppression: SuppressionRules) -> Self {
		self.suppression = suppression;
		self
	}

	/// Bundle text to use instead of fetching `url`.
	pub fn bundle(mut self, url: impl Into<String>, text: impl Into<String>) -> Self {
		self.bundles.push((url.into(), text.into()));
		self
	}

	pub fn build(self) -> FrameEngine {
		let cache = SourceMapCache::new(self.fetcher);
		for (url, text) in self.bundles {
			cache.register_bundle(url, text);
		}
		FrameEngine {
			cache,
			context_size: self.context_size,
			suppression: self.suppression,
		}
	}
}
