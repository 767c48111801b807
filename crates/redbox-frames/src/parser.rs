// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stack trace text parsing.
//!
//! Each physical line is tried against a small table of grammars. Lines that
//! match none of them (the error header, blank lines, native frames) are
//! skipped.

use std::sync::LazyLock;

use redbox_frames_core::RawFrame;
use regex::Regex;
use tracing::trace;

static CALL_SITE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\s*at\s.+(:\d+)").expect("call site regex is valid"));

static COMPONENT_WARNING: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\s*in\s.+(:\d+)").expect("component regex is valid"));

static GECKO: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(^|@)\S+:\d+|.+line\s+\d+\s+>\s+(eval|Function).+").expect("gecko regex is valid")
});

static GECKO_EVAL: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r" line (\d+)(?: > eval line \d+)* > (eval|Function):\d+:\d+")
		.expect("gecko eval regex is valid")
});

static EVAL_WRAPPER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(\(eval at [^()]*)|(\),.*$)").expect("eval wrapper regex is valid"));

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\(?(.+?)(?::(\d+))?(?::(\d+))?\)?$").expect("location regex is valid")
});

/// A recognized stack line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grammar {
	/// V8 call sites: `at fn (file:line:col)` or `at file:line:col`.
	CallSite,
	/// Component stacks: `in Component (at file:line)`.
	ComponentWarning,
	/// Firefox and Safari: `fn@file:line:col`.
	Gecko,
}

/// Grammars in the order they are tried.
pub const GRAMMARS: [Grammar; 3] = [Grammar::CallSite, Grammar::ComponentWarning, Grammar::Gecko];

impl Grammar {
	pub fn matches(self, line: &str) -> bool {
		match self {
			Grammar::CallSite => CALL_SITE.is_match(line),
			Grammar::ComponentWarning => COMPONENT_WARNING.is_match(line),
			Grammar::Gecko => GECKO.is_match(line),
		}
	}

	fn parse(self, line: &str) -> Option<RawFrame> {
		match self {
			Grammar::CallSite | Grammar::ComponentWarning => parse_v8_line(line),
			Grammar::Gecko => parse_gecko_line(line),
		}
	}
}

/// Parse stack trace text into frames, in order of appearance.
///
/// V8 stacks and component stacks open with the error message, which may
/// span several lines; everything before the first `at`/`in` line is skipped.
pub fn parse(stack: &str) -> Vec<RawFrame> {
	let lines: Vec<&str> = stack.lines().collect();
	let first_frame = lines
		.iter()
		.position(|line| Grammar::CallSite.matches(line) || Grammar::ComponentWarning.matches(line))
		.unwrap_or(0);
	lines[first_frame..]
		.iter()
		.filter_map(|line| parse_line(line))
		.collect()
}

/// Parse a single line, or `None` when no grammar recognizes it.
pub fn parse_line(line: &str) -> Option<RawFrame> {
	let Some(grammar) = GRAMMARS.into_iter().find(|g| g.matches(line)) else {
		trace!(line, "skipping unrecognized stack line");
		return None;
	};
	grammar.parse(line)
}

fn parse_v8_line(line: &str) -> Option<RawFrame> {
	let mut line = line.to_string();
	if line.contains("(eval ") {
		line = EVAL_WRAPPER.replace_all(&line, "").into_owned();
	}
	if line.contains("(at ") {
		line = line.replacen("(at ", "(", 1);
	}

	// First token is the `at`/`in` keyword, last is the location.
	let mut tokens: Vec<&str> = line.split_whitespace().skip(1).collect();
	let location = tokens.pop()?;
	let name = tokens.join(" ");

	Some(frame_at(non_empty(&name), location))
}

fn parse_gecko_line(line: &str) -> Option<RawFrame> {
	let mut line = line.to_string();
	let mut is_eval = false;
	if line.contains(" > eval") || line.contains(" > Function") {
		line = GECKO_EVAL.replace_all(&line, ":$1").into_owned();
		is_eval = true;
	}

	let (name, location) = match line.rsplit_once('@') {
		Some((name, location)) => (non_empty(name), location),
		None => (None, line.as_str()),
	};
	let name = name.or(if is_eval { Some("eval") } else { None });

	Some(frame_at(name, location))
}

fn frame_at(function_name: Option<&str>, location: &str) -> RawFrame {
	let (file_name, line_number, column_number) = extract_location(location);
	RawFrame::new(function_name, file_name, line_number, column_number)
}

/// Split `(file:line:col)` into its parts. Parenthesis and either number are
/// optional; numbers that do not fit a `u32` are dropped.
fn extract_location(token: &str) -> (Option<String>, Option<u32>, Option<u32>) {
	let Some(caps) = LOCATION.captures(token) else {
		return (None, None, None);
	};
	let number = |idx: usize| caps.get(idx).and_then(|m| m.as_str().parse::<u32>().ok());
	(
		caps.get(1).map(|m| m.as_str().to_string()),
		number(2),
		number(3),
	)
}

fn non_empty(s: &str) -> Option<&str> {
	let s = s.trim();
	if s.is_empty() {
		None
	} else {
		Some(s)
	}
}
