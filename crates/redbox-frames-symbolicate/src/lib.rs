// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source map decoding for redbox stack frame resolution.
//!
//! This crate provides functionality for:
//! - Parsing JavaScript source maps (v3)
//! - Mapping compiled positions to original ones and back
//! - Extracting code context windows for display
//!
//! # Example
//!
//! ```
//! use redbox_frames_symbolicate::SourceMapConsumer;
//!
//! let source_map_json = r#"{
//!     "version": 3,
//!     "sources": ["src/app.ts"],
//!     "sourcesContent": ["throw new Error('boom');"],
//!     "names": [],
//!     "mappings": "AAAA"
//! }"#;
//! let consumer: SourceMapConsumer = source_map_json.parse().unwrap();
//!
//! let position = consumer.original_position_for(1, Some(0)).unwrap();
//! assert_eq!(position.source, "src/app.ts");
//! assert_eq!(position.line, 1);
//!
//! let source = consumer.source_content_for(&position.source).unwrap();
//! let context = redbox_frames_symbolicate::extract(source, position.line, 3).unwrap();
//! assert!(context[0].highlight);
//! ```

pub mod context;
pub mod error;
pub mod sourcemap;
pub mod vlq;

pub use context::extract;
pub use error::{Result, SymbolicateError};
pub use sourcemap::{GeneratedPosition, OriginalPosition, SourceMapConsumer};
pub use vlq::{
	decode_vlq_mappings, decode_vlq_segment, encode_vlq_segment, DecodedMappings, Mapping, SourceSegment,
};
