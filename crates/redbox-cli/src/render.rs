// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Plain text rendering of frames for the terminal.

use std::fmt::Write;

use redbox_frames_core::{RawFrame, ScriptLine, StackFrame};

/// Printed when every frame of the stack was suppressed.
pub const NO_ACTIONABLE_FRAMES: &str = "no actionable frames";

/// One line per raw frame: `name file:line:column`.
pub fn render_raw(frames: &[RawFrame]) -> String {
	let mut out = String::new();
	for frame in frames {
		let frame = StackFrame::from(frame.clone());
		let _ = writeln!(out, "{frame}");
	}
	out
}

/// Resolved frames with their context, preferring original source lines.
pub fn render_resolved(message: &str, frames: &[StackFrame]) -> String {
	let mut out = String::new();
	if !message.is_empty() {
		let _ = writeln!(out, "{message}");
	}
	for frame in frames {
		let _ = writeln!(out, "  {frame}");
		let lines = frame
			.original_script_code
			.as_deref()
			.or(frame.script_code.as_deref())
			.unwrap_or_default();
		render_context(&mut out, lines);
	}
	out
}

fn render_context(out: &mut String, lines: &[ScriptLine]) {
	let width = lines
		.iter()
		.map(|line| line.line_number.to_string().len())
		.max()
		.unwrap_or(0);
	for line in lines {
		let marker = if line.highlight { '>' } else { ' ' };
		let _ = writeln!(
			out,
			"    {marker} {:>width$} | {}",
			line.line_number, line.content
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_render_raw_uses_compiled_location() {
		let frames = vec![
			RawFrame {
				function_name: Some("render".to_string()),
				file_name: Some("bundle.js".to_string()),
				line_number: Some(10),
				column_number: Some(4),
			},
			RawFrame::default(),
		];

		assert_eq!(
			render_raw(&frames),
			"render (bundle.js:10:4)\n(anonymous function)\n"
		);
	}

	#[test]
	fn test_render_resolved_marks_target_line() {
		let frame = StackFrame {
			function_name: Some("App".to_string()),
			original_file_name: Some("webpack:///src/App.js".to_string()),
			original_line_number: Some(10),
			original_column_number: Some(0),
			original_script_code: Some(vec![
				ScriptLine::new(9, "const a = 1;", false),
				ScriptLine::new(10, "throw new Error('boom');", true),
			]),
			..StackFrame::default()
		};

		let out = render_resolved("Error: boom", &[frame]);

		assert_eq!(
			out,
			"Error: boom\n  App (webpack:///src/App.js:10:0)\n       9 | const a = 1;\n    > 10 | throw new Error('boom');\n"
		);
	}

	#[test]
	fn test_render_resolved_falls_back_to_compiled_context() {
		let frame = StackFrame {
			file_name: Some("bundle.js".to_string()),
			line_number: Some(2),
			script_code: Some(vec![ScriptLine::new(2, "x()", true)]),
			..StackFrame::default()
		};

		let out = render_resolved("", &[frame]);
		assert_eq!(out, "  (anonymous function) (bundle.js:2)\n    > 2 | x()\n");
	}
}
