// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack frame types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Label used when a frame has no function name.
pub const ANONYMOUS_FUNCTION: &str = "(anonymous function)";

/// Function names that carry no information for a reader.
const MEANINGLESS_NAMES: &[&str] = &[
	"friendlySyntaxErrorLabel",
	"exports.__esModule",
	"<anonymous>",
];

/// Normalize a function name as reported by the JS engine.
///
/// Strips the `Object.` receiver prefix and maps placeholder names to `None`.
pub fn normalize_function_name(name: Option<&str>) -> Option<String> {
	let name = name?;
	let name = name.strip_prefix("Object.").unwrap_or(name);
	if name.is_empty() || MEANINGLESS_NAMES.contains(&name) {
		return None;
	}
	Some(name.to_string())
}

/// A call site exactly as it appeared in a stack trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFrame {
	pub function_name: Option<String>,
	pub file_name: Option<String>,
	pub line_number: Option<u32>,
	pub column_number: Option<u32>,
}

impl RawFrame {
	/// Build a frame, normalizing the function name.
	pub fn new(
		function_name: Option<&str>,
		file_name: Option<String>,
		line_number: Option<u32>,
		column_number: Option<u32>,
	) -> Self {
		Self {
			function_name: normalize_function_name(function_name),
			file_name,
			line_number,
			column_number,
		}
	}
}

/// One physical line of a code context window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptLine {
	/// Line number in the source text (1-indexed, never renumbered).
	pub line_number: u32,
	pub content: String,
	/// True for the line the frame points at.
	pub highlight: bool,
}

impl ScriptLine {
	pub fn new(line_number: u32, content: impl Into<String>, highlight: bool) -> Self {
		Self {
			line_number,
			content: content.into(),
			highlight,
		}
	}
}

/// A stack frame enriched with original source positions and code context.
///
/// A frame is resolved iff `original_file_name` is set. Every position that
/// could not be determined stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackFrame {
	pub function_name: Option<String>,
	pub file_name: Option<String>,
	pub line_number: Option<u32>,
	pub column_number: Option<u32>,
	/// Context lines from the compiled bundle.
	pub script_code: Option<Vec<ScriptLine>>,
	pub original_function_name: Option<String>,
	pub original_file_name: Option<String>,
	pub original_line_number: Option<u32>,
	pub original_column_number: Option<u32>,
	/// Context lines from the original source, when the map embeds it.
	pub original_script_code: Option<Vec<ScriptLine>>,
}

impl StackFrame {
	pub fn is_resolved(&self) -> bool {
		self.original_file_name.is_some()
	}

	/// The compiled call site this frame was built from.
	pub fn raw(&self) -> RawFrame {
		RawFrame {
			function_name: self.function_name.clone(),
			file_name: self.file_name.clone(),
			line_number: self.line_number,
			column_number: self.column_number,
		}
	}

	pub fn function_name_or_anonymous(&self) -> &str {
		self.function_name.as_deref().unwrap_or(ANONYMOUS_FUNCTION)
	}

	/// `file:line:column` of the compiled position, omitting unknown parts.
	pub fn compiled_location(&self) -> Option<String> {
		format_location(
			self.file_name.as_deref(),
			self.line_number,
			self.column_number,
		)
	}

	/// `file:line:column` of the original position, omitting unknown parts.
	pub fn original_location(&self) -> Option<String> {
		format_location(
			self.original_file_name.as_deref(),
			self.original_line_number,
			self.original_column_number,
		)
	}
}

impl From<RawFrame> for StackFrame {
	fn from(raw: RawFrame) -> Self {
		Self {
			function_name: raw.function_name,
			file_name: raw.file_name,
			line_number: raw.line_number,
			column_number: raw.column_number,
			..Self::default()
		}
	}
}

impl fmt::Display for StackFrame {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = self
			.original_function_name
			.as_deref()
			.or(self.function_name.as_deref())
			.unwrap_or(ANONYMOUS_FUNCTION);
		let location = if self.is_resolved() {
			self.original_location()
		} else {
			self.compiled_location()
		};
		match location {
			Some(location) => write!(f, "{} ({})", name, location),
			None => write!(f, "{}", name),
		}
	}
}

fn format_location(file: Option<&str>, line: Option<u32>, column: Option<u32>) -> Option<String> {
	let mut parts = Vec::with_capacity(3);
	if let Some(file) = file {
		parts.push(file.to_string());
	}
	if let Some(line) = line {
		parts.push(line.to_string());
	}
	if let Some(column) = column {
		parts.push(column.to_string());
	}
	if parts.is_empty() {
		None
	} else {
		Some(parts.join(":"))
	}
}
