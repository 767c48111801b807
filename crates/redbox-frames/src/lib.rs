// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack frame resolution for redbox.
//!
//! Turns the stack text of a JavaScript error into frames pointing at original
//! source positions, with code context around each one.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use redbox_frames::{FrameEngine, HttpFetcher};
//! use redbox_frames_core::CapturedError;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpFetcher::with_timeout(std::time::Duration::from_secs(10))?
//! 	.base_url("http://localhost:3000/".parse()?);
//! let engine = FrameEngine::new(Arc::new(fetcher));
//!
//! let error = CapturedError::new(
//! 	"TypeError: x is null",
//! 	"TypeError: x is null\n    at render (http://localhost:3000/static/js/bundle.js:26122:21)",
//! );
//!
//! if let Some(frames) = engine.get_stack_frames(&error, false, 3).await? {
//! 	for frame in frames {
//! 		println!("{frame}");
//! 	}
//! }
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod parser;
pub mod resolver;

pub use capture::{listen, massage_warning, ComponentFrame, ErrorCapture, ErrorReceiver, ErrorReporter};
pub use engine::{FrameEngine, FrameEngineBuilder, SuppressionRules};
pub use error::{FetchError, FramesError, Result, UNSUPPORTED_ENCODING_MESSAGE};
pub use fetch::{fetch_location, FileFetcher, Fetcher, HttpFetcher, InMemoryFetcher};
pub use loader::{extract_source_map_url, LoadedBundle, SourceMapCache};
pub use parser::{parse, parse_line, Grammar};
pub use resolver::{Pathway, Resolver, DEFAULT_CONTEXT_SIZE};
