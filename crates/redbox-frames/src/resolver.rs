// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolution of parsed frames against bundle source maps.
//!
//! Two pathways share the loader and context extraction:
//!
//! - **Map**: frames carry compiled positions and every distinct file name is
//!   its own bundle.
//! - **Unmap**: frames carry original positions (component stacks) within one
//!   known bundle; each frame's file is matched against the map's sources and
//!   the compiled position is looked up in reverse.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use redbox_frames_core::StackFrame;
use redbox_frames_symbolicate::extract;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::loader::{LoadedBundle, SourceMapCache};

/// Lines of context shown on each side of a frame's line.
pub const DEFAULT_CONTEXT_SIZE: usize = 3;

/// Directory name whose sources rank last when matching unmap candidates.
const DEPENDENCY_DIR: &str = "node_modules";

/// How frame positions relate to the bundle they are resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pathway<'a> {
	/// Compiled positions, one bundle per distinct file name.
	Map,
	/// Original positions inside the bundle at `bundle_url`.
	Unmap {
		bundle_url: &'a str,
		/// Bundle text when the caller already holds it.
		bundle_text: Option<&'a str>,
	},
}

/// Resolves frames through a shared [`SourceMapCache`].
pub struct Resolver<'a> {
	cache: &'a SourceMapCache,
	context_size: usize,
}

impl<'a> Resolver<'a> {
	pub fn new(cache: &'a SourceMapCache) -> Self {
		Self {
			cache,
			context_size: DEFAULT_CONTEXT_SIZE,
		}
	}

	pub fn context_size(mut self, context_size: usize) -> Self {
		self.context_size = context_size;
		self
	}

	/// Resolve `frames`, preserving their order.
	///
	/// Frames that are already resolved are returned unchanged. Only an
	/// unsupported inline map encoding fails the call; any other load failure
	/// leaves the affected frames unresolved.
	#[instrument(skip_all, fields(frames = frames.len(), pathway = ?pathway))]
	pub async fn resolve(&self, frames: Vec<StackFrame>, pathway: Pathway<'_>) -> Result<Vec<StackFrame>> {
		match pathway {
			Pathway::Map => self.map(frames).await,
			Pathway::Unmap {
				bundle_url,
				bundle_text,
			} => self.unmap(frames, bundle_url, bundle_text).await,
		}
	}

	async fn map(&self, frames: Vec<StackFrame>) -> Result<Vec<StackFrame>> {
		let mut files: Vec<&str> = Vec::new();
		for frame in frames.iter().filter(|f| !f.is_resolved()) {
			if let Some(file) = frame.file_name.as_deref() {
				if !files.contains(&file) {
					files.push(file);
				}
			}
		}

		let loads = files.iter().map(|file| async move { (*file, self.cache.load(file, None).await) });
		let mut bundles: HashMap<&str, Arc<LoadedBundle>> = HashMap::new();
		for (file, result) in join_all(loads).await {
			match result {
				Ok(bundle) => {
					bundles.insert(file, bundle);
				}
				Err(e) if e.is_fatal() => return Err(e),
				Err(e) => {
					warn!(file, error = %e, "could not load source map, frames stay unresolved");
				}
			}
		}

		let resolved = frames
			.iter()
			.map(|frame| {
				let bundle = frame
					.file_name
					.as_deref()
					.filter(|_| !frame.is_resolved())
					.and_then(|file| bundles.get(file));
				match bundle {
					Some(bundle) => self.map_frame(frame, bundle),
					None => frame.clone(),
				}
			})
			.collect();
		Ok(resolved)
	}

	fn map_frame(&self, frame: &StackFrame, bundle: &LoadedBundle) -> StackFrame {
		let Some(line) = frame.line_number else {
			return frame.clone();
		};

		let mut resolved = frame.clone();
		resolved.script_code = extract(&bundle.text, line, self.context_size);

		match bundle.map.original_position_for(line, frame.column_number) {
			Some(position) => {
				resolved.original_script_code = bundle
					.map
					.source_content_for(&position.source)
					.and_then(|content| extract(content, position.line, self.context_size));
				resolved.original_function_name = frame.function_name.clone();
				resolved.original_file_name = Some(position.source);
				resolved.original_line_number = Some(position.line);
				resolved.original_column_number = Some(position.column);
			}
			None => {
				debug!(
					file = bundle.url.as_str(),
					line,
					column = ?frame.column_number,
					"no mapping covers position"
				);
			}
		}
		resolved
	}

	async fn unmap(
		&self,
		frames: Vec<StackFrame>,
		bundle_url: &str,
		bundle_text: Option<&str>,
	) -> Result<Vec<StackFrame>> {
		let bundle = match self.cache.load(bundle_url, bundle_text).await {
			Ok(bundle) => bundle,
			Err(e) if e.is_fatal() => return Err(e),
			Err(e) => {
				warn!(bundle_url, error = %e, "could not load source map, frames stay unresolved");
				return Ok(frames);
			}
		};

		Ok(frames
			.into_iter()
			.map(|frame| {
				if frame.original_line_number.is_some() {
					frame
				} else {
					self.unmap_frame(frame, &bundle)
				}
			})
			.collect())
	}

	fn unmap_frame(&self, frame: StackFrame, bundle: &LoadedBundle) -> StackFrame {
		let Some(file_name) = frame.file_name.as_deref().map(strip_query).map(normalize_path) else {
			return frame;
		};

		let line = frame.line_number;
		let column = frame.column_number;
		let source = best_source_match(bundle.map.sources(), &file_name);

		let (Some(source), Some(line)) = (source, line) else {
			return StackFrame {
				original_function_name: frame.function_name,
				original_file_name: Some(file_name),
				original_line_number: line,
				original_column_number: column,
				..StackFrame::default()
			};
		};

		let generated = bundle.map.generated_position_for(source, line, column);
		let original_script_code = bundle
			.map
			.source_content_for(source)
			.and_then(|content| extract(content, line, self.context_size));
		let script_code = generated.and_then(|pos| extract(&bundle.text, pos.line, self.context_size));

		StackFrame {
			function_name: frame.function_name.clone(),
			file_name: Some(bundle.url.clone()),
			line_number: generated.map(|pos| pos.line),
			column_number: generated.map(|pos| pos.column),
			script_code,
			original_function_name: frame.function_name,
			original_file_name: Some(file_name),
			original_line_number: Some(line),
			original_column_number: column,
			original_script_code,
		}
	}
}

fn strip_query(file_name: &str) -> &str {
	file_name.split('?').next().unwrap_or(file_name)
}

/// Collapse `.`, `..` and repeated separators in a `/`-separated path.
pub fn normalize_path(path: &str) -> String {
	let absolute = path.starts_with('/');
	let mut parts: Vec<&str> = Vec::new();
	for part in path.split('/') {
		match part {
			"" | "." => {}
			".." => {
				if matches!(parts.last(), Some(last) if *last != "..") {
					parts.pop();
				} else if !absolute {
					parts.push("..");
				}
			}
			part => parts.push(part),
		}
	}
	let joined = parts.join("/");
	if absolute {
		format!("/{}", joined)
	} else if joined.is_empty() {
		".".to_string()
	} else {
		joined
	}
}

/// The map source that best matches a frame's file name.
///
/// Candidates end with `file_name` at a path boundary. Ties are broken by
/// fewest separators, then fewest dependency markers, then shortest name.
pub fn best_source_match<'s>(sources: &'s [String], file_name: &str) -> Option<&'s str> {
	let file_name = file_name.trim_start_matches("./");
	sources
		.iter()
		.filter_map(|source| {
			let normalized = normalize_path(&source.replace('\\', "/"));
			let prefix = normalized.strip_suffix(file_name)?;
			if !(prefix.is_empty() || prefix.ends_with('/') || file_name.starts_with('/')) {
				return None;
			}
			let separators = normalized.matches('/').count();
			let penalties = normalized.matches(DEPENDENCY_DIR).count() + normalized.matches('~').count();
			Some((separators, penalties, source.len(), source.as_str()))
		})
		.min()
		.map(|(_, _, _, source)| source)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fetch::InMemoryFetcher;
	use base64::engine::general_purpose::STANDARD;
	use base64::Engine;
	use redbox_frames_core::RawFrame;
	use redbox_frames_symbolicate::encode_vlq_segment;

	const APP_SOURCE: &str = "import React from 'react';\n\nclass App {\n  render() {\n    const x = null;\n    return (\n      x.y\n    );\n  }\n}\n";

	/// Bundle whose line 3 column 4 maps to `src/App.js:7:6`.
	fn bundle_text() -> String {
		let mappings = format!(";;{}", encode_vlq_segment(&[4, 0, 6, 6]));
		let map = serde_json::json!({
			"version": 3,
			"sources": ["webpack:///src/App.js", "webpack:///node_modules/react/App.js"],
			"sourcesContent": [APP_SOURCE, null],
			"names": [],
			"mappings": mappings,
		});
		format!(
			"(function() {{\n  var a;\n    a.y;\n}})();\n//# sourceMappingURL=data:application/json;base64,{}\n",
			STANDARD.encode(map.to_string())
		)
	}

	fn frame(name: &str, file: &str, line: u32, column: Option<u32>) -> StackFrame {
		StackFrame::from(RawFrame::new(Some(name), Some(file.to_string()), Some(line), column))
	}

	fn cache() -> (Arc<InMemoryFetcher>, SourceMapCache) {
		let fetcher = Arc::new(InMemoryFetcher::new());
		fetcher.insert("/static/js/bundle.js", bundle_text());
		let cache = SourceMapCache::new(fetcher.clone());
		(fetcher, cache)
	}

	#[tokio::test]
	async fn test_map_resolves_compiled_position() {
		let (_, cache) = cache();
		let frames = vec![frame("render", "/static/js/bundle.js", 3, Some(4))];

		let resolved = Resolver::new(&cache).resolve(frames, Pathway::Map).await.unwrap();

		let f = &resolved[0];
		assert_eq!(f.original_file_name.as_deref(), Some("webpack:///src/App.js"));
		assert_eq!(f.original_line_number, Some(7));
		assert_eq!(f.original_column_number, Some(6));
		assert_eq!(f.original_function_name.as_deref(), Some("render"));

		let original = f.original_script_code.as_ref().unwrap();
		let highlighted: Vec<_> = original.iter().filter(|l| l.highlight).collect();
		assert_eq!(highlighted.len(), 1);
		assert_eq!(highlighted[0].line_number, 7);
		assert_eq!(highlighted[0].content.trim(), "x.y");

		let compiled = f.script_code.as_ref().unwrap();
		assert!(compiled.iter().any(|l| l.highlight && l.line_number == 3));
	}

	#[tokio::test]
	async fn test_map_miss_keeps_script_code() {
		let (_, cache) = cache();
		let frames = vec![frame("f", "/static/js/bundle.js", 1, Some(0))];

		let resolved = Resolver::new(&cache).resolve(frames, Pathway::Map).await.unwrap();

		assert!(!resolved[0].is_resolved());
		assert!(resolved[0].script_code.is_some());
		assert_eq!(resolved[0].original_line_number, None);
	}

	#[tokio::test]
	async fn test_map_line_past_end_has_no_script_code() {
		let (_, cache) = cache();
		let frames = vec![frame("f", "/static/js/bundle.js", 500, Some(0))];

		let resolved = Resolver::new(&cache).resolve(frames, Pathway::Map).await.unwrap();

		assert!(!resolved[0].is_resolved());
		assert_eq!(resolved[0].script_code, None);
	}

	#[tokio::test]
	async fn test_map_fetch_failure_leaves_frames_unresolved() {
		let (_, cache) = cache();
		let frames = vec![
			frame("a", "/missing.js", 1, Some(0)),
			frame("b", "/static/js/bundle.js", 3, Some(4)),
		];

		let resolved = Resolver::new(&cache).resolve(frames.clone(), Pathway::Map).await.unwrap();

		assert_eq!(resolved[0], frames[0]);
		assert!(resolved[1].is_resolved());
	}

	#[tokio::test]
	async fn test_map_is_idempotent() {
		let (fetcher, cache) = cache();
		let frames = vec![frame("render", "/static/js/bundle.js", 3, Some(4))];
		let resolver = Resolver::new(&cache);

		let once = resolver.resolve(frames, Pathway::Map).await.unwrap();
		let twice = resolver.resolve(once.clone(), Pathway::Map).await.unwrap();

		assert_eq!(once, twice);
		assert_eq!(fetcher.fetch_count("/static/js/bundle.js"), 1);
	}

	#[tokio::test]
	async fn test_unmap_resolves_original_position() {
		let (_, cache) = cache();
		let frames = vec![frame("App", "App.js", 7, Some(6))];

		let resolved = Resolver::new(&cache)
			.context_size(1)
			.resolve(
				frames,
				Pathway::Unmap {
					bundle_url: "/static/js/bundle.js",
					bundle_text: None,
				},
			)
			.await
			.unwrap();

		let f = &resolved[0];
		assert_eq!(f.file_name.as_deref(), Some("/static/js/bundle.js"));
		assert_eq!(f.line_number, Some(3));
		assert_eq!(f.column_number, Some(4));
		assert_eq!(f.original_file_name.as_deref(), Some("App.js"));
		assert_eq!(f.original_line_number, Some(7));
		assert_eq!(f.original_script_code.as_ref().map(Vec::len), Some(3));
	}

	#[tokio::test]
	async fn test_unmap_unknown_source() {
		let (_, cache) = cache();
		let frames = vec![frame("unknown", "blabla.js?x=1", 10, None)];

		let resolved = Resolver::new(&cache)
			.resolve(
				frames,
				Pathway::Unmap {
					bundle_url: "/static/js/bundle.js",
					bundle_text: None,
				},
			)
			.await
			.unwrap();

		assert_eq!(
			resolved[0],
			StackFrame {
				original_function_name: Some("unknown".to_string()),
				original_file_name: Some("blabla.js".to_string()),
				original_line_number: Some(10),
				..StackFrame::default()
			}
		);
	}

	#[tokio::test]
	async fn test_unmap_passes_through_resolved_frames() {
		let (_, cache) = cache();
		let already = StackFrame {
			original_line_number: Some(2),
			..frame("x", "App.js", 2, None)
		};

		let resolved = Resolver::new(&cache)
			.resolve(
				vec![already.clone()],
				Pathway::Unmap {
					bundle_url: "/static/js/bundle.js",
					bundle_text: None,
				},
			)
			.await
			.unwrap();

		assert_eq!(resolved, vec![already]);
	}

	#[test]
	fn test_normalize_path() {
		assert_eq!(normalize_path("./src/../src//App.js"), "src/App.js");
		assert_eq!(normalize_path("/a/b/../c"), "/a/c");
		assert_eq!(normalize_path("../a"), "../a");
		assert_eq!(normalize_path("webpack:///src/App.js"), "webpack:/src/App.js");
	}

	#[test]
	fn test_best_source_match_ranking() {
		let sources = vec![
			"webpack:///node_modules/lib/src/App.js".to_string(),
			"webpack:///src/App.js".to_string(),
			"webpack:///src/MyApp.js".to_string(),
			"webpack:///~/src/App.js".to_string(),
		];

		assert_eq!(best_source_match(&sources, "App.js"), Some("webpack:///src/App.js"));
		assert_eq!(
			best_source_match(&sources, "lib/src/App.js"),
			Some("webpack:///node_modules/lib/src/App.js")
		);
		assert_eq!(best_source_match(&sources, "Other.js"), None);
	}

	#[test]
	fn test_best_source_match_prefers_fewer_dependency_markers() {
		let sources = vec![
			"webpack:///node_modules/x/App.js".to_string(),
			"webpack:///app/src/App.js".to_string(),
		];
		assert_eq!(best_source_match(&sources, "App.js"), Some("webpack:///app/src/App.js"));
	}
}
