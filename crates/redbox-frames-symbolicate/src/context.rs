// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Code context windows around a source line.

use redbox_frames_core::ScriptLine;

/// Extract the lines within `context_size` of `line` (1-indexed).
///
/// The common leading whitespace of the non-empty lines in the window is
/// removed. Line numbers are those of the source text and the target line is
/// highlighted. Returns `None` when `line` is not in the text.
pub fn extract(source: &str, line: u32, context_size: usize) -> Option<Vec<ScriptLine>> {
	let lines: Vec<&str> = source.lines().collect();

	let line_idx = match (line as usize).checked_sub(1) {
		Some(idx) if idx < lines.len() => idx,
		_ => return None,
	};

	let start = line_idx.saturating_sub(context_size);
	let end = line_idx
		.saturating_add(context_size)
		.saturating_add(1)
		.min(lines.len());
	let window = &lines[start..end];

	let indent = window
		.iter()
		.filter(|l| !l.trim().is_empty())
		.map(|l| leading_whitespace(l))
		.min()
		.unwrap_or(0);

	let extracted = window
		.iter()
		.enumerate()
		.map(|(offset, content)| {
			let idx = start + offset;
			ScriptLine::new(
				idx as u32 + 1,
				strip_chars(content, indent),
				idx == line_idx,
			)
		})
		.collect();
	Some(extracted)
}

fn leading_whitespace(line: &str) -> usize {
	line.chars().take_while(|c| c.is_whitespace()).count()
}

fn strip_chars(line: &str, count: usize) -> &str {
	match line.char_indices().nth(count) {
		Some((byte_idx, _)) => &line[byte_idx..],
		None => "",
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn numbered_source(count: usize, indent: &str) -> String {
		(1..=count)
			.map(|n| format!("{}line {}", indent, n))
			.collect::<Vec<_>>()
			.join("\n")
	}

	#[test]
	fn test_extract_middle_window() {
		let source = numbered_source(20, "    ");

		let lines = extract(&source, 10, 3).unwrap();

		let numbers: Vec<u32> = lines.iter().map(|l| l.line_number).collect();
		assert_eq!(numbers, vec![7, 8, 9, 10, 11, 12, 13]);
		assert_eq!(lines[0].content, "line 7");
		assert!(lines.iter().all(|l| !l.content.starts_with(' ')));

		let highlighted: Vec<u32> = lines
			.iter()
			.filter(|l| l.highlight)
			.map(|l| l.line_number)
			.collect();
		assert_eq!(highlighted, vec![10]);
	}

	#[test]
	fn test_extract_keeps_relative_indent() {
		let source = "function f() {\n\t\tif (x) {\n\t\t\tthrow e;\n\t\t}\n}";

		let lines = extract(source, 3, 1).unwrap();

		let contents: Vec<&str> = lines.iter().map(|l| l.content.as_str()).collect();
		assert_eq!(contents, vec!["if (x) {", "\tthrow e;", "}"]);
	}

	#[test]
	fn test_extract_ignores_blank_lines_for_indent() {
		let source = "  a\n\n  b";

		let lines = extract(source, 2, 1).unwrap();

		let contents: Vec<&str> = lines.iter().map(|l| l.content.as_str()).collect();
		assert_eq!(contents, vec!["a", "", "b"]);
	}

	#[test]
	fn test_extract_at_start() {
		let source = numbered_source(3, "");
		let lines = extract(&source, 1, 2).unwrap();
		assert_eq!(lines.len(), 3);
		assert!(lines[0].highlight);
	}

	#[test]
	fn test_extract_at_end() {
		let source = numbered_source(3, "");
		let lines = extract(&source, 3, 2).unwrap();
		assert_eq!(lines.first().map(|l| l.line_number), Some(1));
		assert!(lines[2].highlight);
	}

	#[test]
	fn test_extract_out_of_bounds() {
		let source = numbered_source(3, "");
		assert_eq!(extract(&source, 10, 2), None);
		assert_eq!(extract(&source, 0, 2), None);
		assert_eq!(extract("", 1, 2), None);
	}

	#[test]
	fn test_extract_zero_context() {
		let source = numbered_source(5, "  ");
		let lines = extract(&source, 4, 0).unwrap();
		assert_eq!(lines, vec![ScriptLine::new(4, "line 4", true)]);
	}

	#[test]
	fn test_extract_huge_context_takes_whole_text() {
		let lines = extract("a\nb\nc", 2, usize::MAX).unwrap();

		let numbers: Vec<u32> = lines.iter().map(|l| l.line_number).collect();
		assert_eq!(numbers, vec![1, 2, 3]);
		assert!(lines[1].highlight);
	}
}
