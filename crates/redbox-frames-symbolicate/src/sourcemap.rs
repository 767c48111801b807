// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Source map parsing and position lookup.
//!
//! Implements the Source Map v3 specification. Lines are 1-indexed and
//! columns 0-indexed on every public method, matching how JS engines report
//! stack positions.

use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Result, SymbolicateError};
use crate::vlq::{decode_vlq_mappings, DecodedMappings};

/// Raw source map JSON structure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
	version: u32,
	#[serde(default)]
	file: Option<String>,
	#[serde(default)]
	source_root: Option<String>,
	sources: Vec<Option<String>>,
	#[serde(default)]
	sources_content: Option<Vec<Option<String>>>,
	#[serde(default)]
	names: Vec<String>,
	mappings: String,
}

/// Parsed source map ready for lookups in both directions.
#[derive(Debug, Clone)]
pub struct SourceMapConsumer {
	/// Generated file name.
	pub file: Option<String>,
	/// Root path prepended to source filenames.
	pub source_root: Option<String>,
	/// Source names as written in the map.
	raw_sources: Vec<String>,
	/// Source names with the source root applied.
	sources: Vec<String>,
	sources_content: Vec<Option<String>>,
	names: Vec<String>,
	mappings: DecodedMappings,
}

/// Original position information from a source map lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
	/// Original source file path, source root applied.
	pub source: String,
	/// Line in the original source (1-indexed).
	pub line: u32,
	/// Column in the original source (0-indexed).
	pub column: u32,
	/// Original identifier name if available.
	pub name: Option<String>,
}

/// Generated position from a reverse lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedPosition {
	/// Line in the generated file (1-indexed).
	pub line: u32,
	/// Column in the generated file (0-indexed).
	pub column: u32,
}

impl SourceMapConsumer {
	/// Parse a source map from JSON bytes.
	pub fn from_bytes(data: &[u8]) -> Result<Self> {
		let raw: RawSourceMap = serde_json::from_slice(data)?;

		if raw.version != 3 {
			return Err(SymbolicateError::InvalidSourceMapVersion(raw.version));
		}

		let mappings = decode_vlq_mappings(&raw.mappings)?;
		let raw_sources: Vec<String> = raw.sources.into_iter().map(Option::unwrap_or_default).collect();

		for mapping in mappings.iter() {
			let Some(segment) = mapping.source else {
				continue;
			};
			if segment.source_index as usize >= raw_sources.len() {
				return Err(SymbolicateError::InvalidSourceIndex(segment.source_index));
			}
			if let Some(name_index) = segment.name_index {
				if name_index as usize >= raw.names.len() {
					return Err(SymbolicateError::InvalidNameIndex(name_index));
				}
			}
		}

		let sources: Vec<String> = raw_sources
			.iter()
			.map(|s| resolve_source_path(raw.source_root.as_deref(), s))
			.collect();

		tracing::trace!(
			sources = sources.len(),
			names = raw.names.len(),
			mappings = mappings.len(),
			"parsed source map"
		);

		Ok(Self {
			file: raw.file,
			source_root: raw.source_root,
			raw_sources,
			sources,
			sources_content: raw.sources_content.unwrap_or_default(),
			names: raw.names,
			mappings,
		})
	}

	/// Lookup the original position for a generated line and column.
	///
	/// Without a column, the first mapping on the line is used. Returns `None`
	/// when no mapping covers the position or the covering mapping has no
	/// original source.
	pub fn original_position_for(&self, line: u32, column: Option<u32>) -> Option<OriginalPosition> {
		let line_0indexed = line.checked_sub(1)?;
		let mapping = self.mappings.find(line_0indexed, column)?;
		let segment = mapping.source?;

		let source = self.sources.get(segment.source_index as usize)?.clone();
		let name = segment
			.name_index
			.and_then(|idx| self.names.get(idx as usize).cloned());

		Some(OriginalPosition {
			source,
			line: segment.original_line + 1,
			column: segment.original_column,
			name,
		})
	}

	/// Lookup the generated position for an original position in `source`.
	pub fn generated_position_for(
		&self,
		source: &str,
		line: u32,
		column: Option<u32>,
	) -> Option<GeneratedPosition> {
		let source_index = self.source_index(source)?;
		let line_0indexed = line.checked_sub(1)?;
		let mapping = self
			.mappings
			.find_generated(source_index as u32, line_0indexed, column)?;

		Some(GeneratedPosition {
			line: mapping.generated_line + 1,
			column: mapping.generated_column,
		})
	}

	/// Embedded content of `source`, matched with or without the source root.
	pub fn source_content_for(&self, source: &str) -> Option<&str> {
		let idx = self.source_index(source)?;
		self.sources_content.get(idx)?.as_deref()
	}

	/// Source names with the source root applied.
	pub fn sources(&self) -> &[String] {
		&self.sources
	}

	fn source_index(&self, source: &str) -> Option<usize> {
		self.sources
			.iter()
			.position(|s| s == source)
			.or_else(|| self.raw_sources.iter().position(|s| s == source))
	}

	/// Check if this source map has embedded source content.
	pub fn has_sources_content(&self) -> bool {
		self.sources_content.iter().any(|c| c.is_some())
	}

	pub fn source_count(&self) -> usize {
		self.sources.len()
	}

	pub fn name_count(&self) -> usize {
		self.names.len()
	}

	pub fn mapping_count(&self) -> usize {
		self.mappings.len()
	}
}

impl FromStr for SourceMapConsumer {
	type Err = SymbolicateError;

	fn from_str(data: &str) -> Result<Self> {
		Self::from_bytes(data.as_bytes())
	}
}

/// Resolve a source path with the source root if present.
fn resolve_source_path(source_root: Option<&str>, source: &str) -> String {
	match source_root {
		Some(root) if !root.is_empty() => {
			let root = root.trim_end_matches('/');
			format!("{}/{}", root, source)
		}
		_ => source.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::vlq::encode_vlq_segment;

	fn sample_source_map() -> &'static str {
		r#"{
			"version": 3,
			"file": "out.js",
			"sourceRoot": "",
			"sources": ["src/index.ts"],
			"sourcesContent": ["function hello() {\n  console.log('Hello, World!');\n}\n\nhello();\n"],
			"names": ["hello", "console", "log"],
			"mappings": "AAAA,SAASA,KAAKC,CAAC;AACXC,OAAQ,CAACC,GAAG,CAAC,eAAe,CAAC,CAAC;AAClC,CAAC;AAEDF,KAAK,EAAE,CAAC"
		}"#
	}

	/// Map generated line `gen_line` column `gen_col` of a bundle to `App.js`.
	fn app_map(gen_line: u32, gen_col: i32, line: i32, col: i32) -> String {
		let mappings = format!(
			"{}{}",
			";".repeat(gen_line as usize - 1),
			encode_vlq_segment(&[gen_col, 0, line - 1, col])
		);
		format!(
			r#"{{"version":3,"sources":["webpack:///src/App.js"],"sourcesContent":["a\nb\n"],"names":[],"mappings":"{}"}}"#,
			mappings
		)
	}

	#[test]
	fn test_parse_source_map() {
		let sm: SourceMapConsumer = sample_source_map().parse().unwrap();

		assert_eq!(sm.file, Some("out.js".to_string()));
		assert_eq!(sm.sources(), ["src/index.ts"]);
		assert_eq!(sm.name_count(), 3);
		assert!(sm.has_sources_content());
		assert!(sm.mapping_count() > 0);
	}

	#[test]
	fn test_original_position_for() {
		let sm: SourceMapConsumer = sample_source_map().parse().unwrap();

		let pos = sm.original_position_for(1, Some(0)).unwrap();
		assert_eq!(pos.source, "src/index.ts");
		assert_eq!(pos.line, 1);
		assert_eq!(pos.column, 0);
	}

	#[test]
	fn test_original_position_for_deep_line() {
		let sm: SourceMapConsumer = app_map(26122, 21, 7, 0).parse().unwrap();

		let pos = sm.original_position_for(26122, Some(21)).unwrap();
		assert!(pos.source.ends_with("App.js"));
		assert_eq!((pos.line, pos.column), (7, 0));

		// Later column on the same line still maps to the same segment
		let pos = sm.original_position_for(26122, Some(40)).unwrap();
		assert_eq!(pos.line, 7);

		assert!(sm.original_position_for(26122, Some(3)).is_none());
		assert!(sm.original_position_for(26121, Some(21)).is_none());
		assert!(sm.original_position_for(0, Some(0)).is_none());
	}

	#[test]
	fn test_original_position_line_only() {
		let sm: SourceMapConsumer = app_map(3, 21, 7, 0).parse().unwrap();
		let pos = sm.original_position_for(3, None).unwrap();
		assert_eq!(pos.line, 7);
	}

	#[test]
	fn test_generated_position_for() {
		let sm: SourceMapConsumer = app_map(10, 8, 5, 10).parse().unwrap();

		let pos = sm
			.generated_position_for("webpack:///src/App.js", 5, Some(10))
			.unwrap();
		assert_eq!(pos, GeneratedPosition { line: 10, column: 8 });

		assert!(sm.generated_position_for("other.js", 5, Some(10)).is_none());
		assert!(sm.generated_position_for("webpack:///src/App.js", 6, None).is_none());
	}

	#[test]
	fn test_source_content_for() {
		let sm: SourceMapConsumer = sample_source_map().parse().unwrap();
		let content = sm.source_content_for("src/index.ts").unwrap();
		assert!(content.starts_with("function hello()"));
		assert!(sm.source_content_for("missing.ts").is_none());
	}

	#[test]
	fn test_invalid_version() {
		let json = r#"{"version": 2, "sources": [], "names": [], "mappings": ""}"#;
		let result = json.parse::<SourceMapConsumer>();
		assert!(matches!(
			result,
			Err(SymbolicateError::InvalidSourceMapVersion(2))
		));
	}

	#[test]
	fn test_out_of_range_source_index() {
		let json = r#"{"version": 3, "sources": [], "names": [], "mappings": "AAAA"}"#;
		assert!(matches!(
			json.parse::<SourceMapConsumer>(),
			Err(SymbolicateError::InvalidSourceIndex(0))
		));
	}

	#[test]
	fn test_source_root_resolution() {
		let json = r#"{
			"version": 3,
			"sourceRoot": "src/",
			"sources": ["index.ts"],
			"sourcesContent": ["let x = 1;"],
			"names": [],
			"mappings": "AAAA"
		}"#;
		let sm: SourceMapConsumer = json.parse().unwrap();

		let pos = sm.original_position_for(1, Some(0)).unwrap();
		assert_eq!(pos.source, "src/index.ts");
		assert_eq!(sm.source_content_for("src/index.ts"), Some("let x = 1;"));
		assert_eq!(sm.source_content_for("index.ts"), Some("let x = 1;"));
	}
}
