// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! VLQ (Variable-Length Quantity) decoder for source map mappings.
//!
//! Source maps use Base64 VLQ encoding for compact storage of line/column mappings.
//! This module provides decoding functionality following the source map v3 spec,
//! plus the two lookup tables the resolver needs: one ordered by generated
//! position and one ordered by original position.

use crate::error::{Result, SymbolicateError};

/// Base64 character set used in VLQ encoding.
const BASE64_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Decode a Base64 character to its 6-bit value.
fn decode_char(ch: u8) -> Result<i32> {
	BASE64_CHARS
		.iter()
		.position(|&c| c == ch)
		.map(|pos| pos as i32)
		.ok_or_else(|| SymbolicateError::InvalidVlqChar(ch as char))
}

/// Decode a VLQ-encoded segment into a vector of signed integers.
///
/// Each segment represents one or more values:
/// - Minimum 1 value: generated column offset
/// - Optional 4 more values: source index, original line, original column, name index
pub fn decode_vlq_segment(segment: &str) -> Result<Vec<i32>> {
	let mut values = Vec::new();
	let mut value = 0i64;
	let mut shift = 0u32;

	for ch in segment.bytes() {
		let digit = decode_char(ch)?;

		// Continuation bit is the 6th bit (0b100000 = 32)
		let continuation = digit & 0b100000 != 0;
		let digit_value = i64::from(digit & 0b011111);

		if shift > 31 {
			return Err(SymbolicateError::VlqOverflow(segment.to_string()));
		}
		value += digit_value << shift;
		shift += 5;

		if !continuation {
			// The lowest bit carries the sign
			let negated = value & 1 != 0;
			let magnitude = value >> 1;
			let signed = if negated { -magnitude } else { magnitude };
			let signed = i32::try_from(signed)
				.map_err(|_| SymbolicateError::VlqOverflow(segment.to_string()))?;
			values.push(signed);
			value = 0;
			shift = 0;
		}
	}

	Ok(values)
}

/// Encode values as one VLQ segment.
///
/// Used to build mappings for bundles assembled in memory.
pub fn encode_vlq_segment(values: &[i32]) -> String {
	let mut out = String::new();
	for &value in values {
		let mut vlq = if value < 0 {
			((-i64::from(value)) << 1) | 1
		} else {
			i64::from(value) << 1
		};
		loop {
			let mut digit = (vlq & 0b011111) as usize;
			vlq >>= 5;
			if vlq > 0 {
				digit |= 0b100000;
			}
			out.push(BASE64_CHARS[digit] as char);
			if vlq == 0 {
				break;
			}
		}
	}
	out
}

/// Original-side half of a mapping segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSegment {
	/// Index into the sources array.
	pub source_index: u32,
	/// Line in the original file (0-indexed).
	pub original_line: u32,
	/// Column in the original file (0-indexed).
	pub original_column: u32,
	/// Optional index into the names array.
	pub name_index: Option<u32>,
}

/// A single mapping entry in the decoded source map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
	/// Line in the generated file (0-indexed).
	pub generated_line: u32,
	/// Column in the generated file (0-indexed).
	pub generated_column: u32,
	/// `None` for single-field segments, which mark generated code with no
	/// original counterpart.
	pub source: Option<SourceSegment>,
}

/// Container for decoded mappings with efficient lookup in both directions.
#[derive(Debug, Clone, Default)]
pub struct DecodedMappings {
	/// Mappings sorted by generated line, then generated column.
	mappings: Vec<Mapping>,
	/// Sourced mappings sorted by source, original line, original column.
	by_original: Vec<OriginalKey>,
}

/// Original position of a sourced mapping plus its index in `mappings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OriginalKey {
	source_index: u32,
	original_line: u32,
	original_column: u32,
	mapping: usize,
}

impl DecodedMappings {
	pub fn new() -> Self {
		Self {
			mappings: Vec::new(),
			by_original: Vec::new(),
		}
	}

	/// Build the lookup tables from mappings in any order.
	pub fn from_mappings(mut mappings: Vec<Mapping>) -> Self {
		mappings.sort_by_key(|m| (m.generated_line, m.generated_column));

		let mut by_original: Vec<OriginalKey> = mappings
			.iter()
			.enumerate()
			.filter_map(|(mapping, m)| {
				m.source.map(|seg| OriginalKey {
					source_index: seg.source_index,
					original_line: seg.original_line,
					original_column: seg.original_column,
					mapping,
				})
			})
			.collect();
		// `mapping` breaks ties in generated order
		by_original.sort();

		Self {
			mappings,
			by_original,
		}
	}

	/// Find the mapping for a given generated line and column.
	///
	/// Uses binary search to find the closest mapping at or before the given
	/// position on the same line. Without a column, the first mapping of the
	/// line is returned.
	pub fn find(&self, line: u32, column: Option<u32>) -> Option<&Mapping> {
		let line_start = self
			.mappings
			.partition_point(|m| m.generated_line < line);
		let line_end = self
			.mappings
			.partition_point(|m| m.generated_line <= line);

		if line_start >= line_end {
			return None;
		}

		let line_mappings = &self.mappings[line_start..line_end];

		let Some(column) = column else {
			return line_mappings.first();
		};

		let idx = line_mappings.partition_point(|m| m.generated_column <= column);

		if idx == 0 {
			// Column is before all mappings on this line
			None
		} else {
			Some(&line_mappings[idx - 1])
		}
	}

	/// Find the mapping for an original position in the given source.
	///
	/// Mirrors [`find`](Self::find): closest mapping at or before the column on
	/// the same original line, or the first mapping of the line without a column.
	pub fn find_generated(
		&self,
		source_index: u32,
		line: u32,
		column: Option<u32>,
	) -> Option<&Mapping> {
		let line_start = self
			.by_original
			.partition_point(|k| (k.source_index, k.original_line) < (source_index, line));
		let line_end = self
			.by_original
			.partition_point(|k| (k.source_index, k.original_line) <= (source_index, line));

		if line_start >= line_end {
			return None;
		}

		let line_keys = &self.by_original[line_start..line_end];

		let Some(column) = column else {
			return line_keys.first().map(|k| &self.mappings[k.mapping]);
		};

		let pos = line_keys.partition_point(|k| k.original_column <= column);
		if pos == 0 {
			None
		} else {
			Some(&self.mappings[line_keys[pos - 1].mapping])
		}
	}

	/// All mappings in generated order.
	pub fn iter(&self) -> impl Iterator<Item = &Mapping> {
		self.mappings.iter()
	}

	pub fn len(&self) -> usize {
		self.mappings.len()
	}

	pub fn is_empty(&self) -> bool {
		self.mappings.is_empty()
	}
}

fn to_position(value: i64, what: &'static str) -> Result<u32> {
	u32::try_from(value).map_err(|_| SymbolicateError::NegativePosition(what))
}

/// Decode VLQ-encoded source map mappings string into structured form.
///
/// The mappings string format:
/// - Lines are separated by semicolons (;)
/// - Segments within a line are separated by commas (,)
/// - Each segment contains 1, 4, or 5 VLQ-encoded values
pub fn decode_vlq_mappings(mappings: &str) -> Result<DecodedMappings> {
	let mut decoded = Vec::new();
	let mut generated_line = 0u32;

	// Fields other than the generated column are delta-encoded across lines
	let mut prev_source = 0i64;
	let mut prev_original_line = 0i64;
	let mut prev_original_column = 0i64;
	let mut prev_name = 0i64;

	for line in mappings.split(';') {
		let mut generated_column = 0i64;

		for segment in line.split(',') {
			if segment.is_empty() {
				continue;
			}

			let values = decode_vlq_segment(segment)?;

			match values.len() {
				1 | 4 | 5 => {}
				n => return Err(SymbolicateError::InvalidSegmentLength(n)),
			}

			generated_column += i64::from(values[0]);

			let source = if values.len() >= 4 {
				prev_source += i64::from(values[1]);
				prev_original_line += i64::from(values[2]);
				prev_original_column += i64::from(values[3]);

				let name_index = if values.len() == 5 {
					prev_name += i64::from(values[4]);
					Some(to_position(prev_name, "name index")?)
				} else {
					None
				};

				Some(SourceSegment {
					source_index: to_position(prev_source, "source index")?,
					original_line: to_position(prev_original_line, "original line")?,
					original_column: to_position(prev_original_column, "original column")?,
					name_index,
				})
			} else {
				None
			};

			decoded.push(Mapping {
				generated_line,
				generated_column: to_position(generated_column, "generated column")?,
				source,
			});
		}

		generated_line += 1;
	}

	Ok(DecodedMappings::from_mappings(decoded))
}
