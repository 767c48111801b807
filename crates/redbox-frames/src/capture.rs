// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery of captured runtime errors to a crash handler.
//!
//! Hosts report errors through an [`ErrorReporter`]; [`listen`] resolves each
//! one and hands the records worth showing to the crash callback. Dropping
//! every reporter stops the listener.

use std::sync::LazyLock;

use redbox_frames_core::{CapturedError, ErrorRecord, ANONYMOUS_FUNCTION};
use regex::Regex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::FrameEngine;

/// Bundle that console warnings are resolved against by default.
pub const DEFAULT_BUNDLE_URL: &str = "/static/js/bundle.js";

/// Component frames closer than this to the previous one in the same file
/// are collapsed.
const COLLAPSE_LINE_DISTANCE: u32 = 3;

static INLINE_COMPONENT_LINE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\s*in").expect("component line regex is valid"));

/// One entry of a component stack attached to a console warning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentFrame {
	pub name: Option<String>,
	pub file_name: Option<String>,
	pub line_number: Option<u32>,
}

impl ComponentFrame {
	pub fn new(name: Option<&str>, file_name: &str, line_number: u32) -> Self {
		Self {
			name: name.map(str::to_string),
			file_name: Some(file_name.to_string()),
			line_number: Some(line_number),
		}
	}
}

/// Rebuild a console warning as a captured error.
///
/// Inline component lines are removed from the message and the stack is
/// regenerated from `frames`, skipping frames without a location and frames
/// within a few lines of the previous one in the same file.
pub fn massage_warning(message: &str, frames: &[ComponentFrame]) -> (String, String) {
	let message = message
		.lines()
		.filter(|line| !INLINE_COMPONENT_LINE.is_match(line))
		.collect::<Vec<_>>()
		.join("\n");

	let mut stack = String::new();
	let mut last: Option<(&str, u32)> = None;
	for frame in frames {
		let (Some(file), Some(line)) = (frame.file_name.as_deref(), frame.line_number) else {
			continue;
		};
		if let Some((last_file, last_line)) = last {
			if last_file == file && last_line.abs_diff(line) < COLLAPSE_LINE_DISTANCE {
				continue;
			}
		}
		last = Some((file, line));

		let name = frame.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(ANONYMOUS_FUNCTION);
		stack.push_str(&format!("in {} (at {}:{})\n", name, file, line));
	}

	(message, stack)
}

#[derive(Debug)]
struct Report {
	error: CapturedError,
	unhandled_rejection: bool,
}

/// Constructor for reporter and receiver pairs.
pub struct ErrorCapture;

impl ErrorCapture {
	/// Channel whose console warnings resolve against the default bundle.
	pub fn channel() -> (ErrorReporter, ErrorReceiver) {
		Self::channel_for(DEFAULT_BUNDLE_URL)
	}

	/// Channel whose console warnings resolve against `bundle_url`.
	pub fn channel_for(bundle_url: impl Into<String>) -> (ErrorReporter, ErrorReceiver) {
		let (tx, rx) = mpsc::unbounded_channel();
		(
			ErrorReporter {
				tx,
				bundle_url: bundle_url.into(),
			},
			ErrorReceiver { rx },
		)
	}
}

/// Sending half, cloned into every place that observes errors.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
	tx: mpsc::UnboundedSender<Report>,
	bundle_url: String,
}

impl ErrorReporter {
	/// Report an uncaught error. Returns false once nobody is listening.
	pub fn report_error(&self, error: CapturedError) -> bool {
		self.send(error, false)
	}

	/// Report an unhandled promise rejection.
	pub fn report_rejection(&self, error: CapturedError) -> bool {
		self.send(error, true)
	}

	/// Report a console error carrying a component stack.
	pub fn report_console_error(&self, message: &str, frames: &[ComponentFrame]) -> bool {
		let (message, stack) = massage_warning(message, frames);
		let error = CapturedError {
			message,
			stack: Some(stack),
			unmap_source: Some(self.bundle_url.clone()),
		};
		self.send(error, false)
	}

	pub fn is_closed(&self) -> bool {
		self.tx.is_closed()
	}

	fn send(&self, error: CapturedError, unhandled_rejection: bool) -> bool {
		self.tx
			.send(Report {
				error,
				unhandled_rejection,
			})
			.is_ok()
	}
}

/// Receiving half consumed by [`listen`].
#[derive(Debug)]
pub struct ErrorReceiver {
	rx: mpsc::UnboundedReceiver<Report>,
}

/// Resolve reported errors until every reporter is dropped.
///
/// `crash` receives a record for each error with application frames. Errors
/// whose frames cannot be resolved are logged and skipped.
pub async fn listen<F>(engine: &FrameEngine, mut receiver: ErrorReceiver, mut crash: F)
where
	F: FnMut(ErrorRecord),
{
	let context_size = engine.context_size();
	while let Some(report) = receiver.rx.recv().await {
		let result = engine
			.get_stack_frames(&report.error, report.unhandled_rejection, context_size)
			.await;
		match result {
			Ok(Some(stack_frames)) => crash(ErrorRecord {
				error: report.error,
				unhandled_rejection: report.unhandled_rejection,
				context_size,
				stack_frames,
			}),
			Ok(None) => debug!(message = %report.error.message, "error has no application frames"),
			Err(e) => warn!(error = %e, message = %report.error.message, "could not get the stack frames of error"),
		}
	}
	debug!("all error reporters dropped, stopping listener");
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_massage_rebuilds_stack() {
		let message = "Warning: Each child should have a unique \"key\" prop.\n    in div (at B.js:8)\n    in B (at A.js:6)";
		let frames = vec![
			ComponentFrame::new(Some("div"), "B.js", 8),
			ComponentFrame::new(Some("B"), "A.js", 6),
			ComponentFrame::new(None, "App.js", 10),
		];

		let (message, stack) = massage_warning(message, &frames);

		assert_eq!(message, "Warning: Each child should have a unique \"key\" prop.");
		assert_eq!(
			stack,
			"in div (at B.js:8)\nin B (at A.js:6)\nin (anonymous function) (at App.js:10)\n"
		);
	}

	#[test]
	fn test_massage_collapses_nearby_frames() {
		let frames = vec![
			ComponentFrame::new(Some("A"), "App.js", 10),
			ComponentFrame::new(Some("B"), "App.js", 12),
			ComponentFrame::new(Some("C"), "App.js", 13),
			ComponentFrame::new(Some("D"), "Other.js", 14),
			ComponentFrame::default(),
		];

		let (_, stack) = massage_warning("w", &frames);

		assert_eq!(stack, "in A (at App.js:10)\nin C (at App.js:13)\nin D (at Other.js:14)\n");
	}

	#[test]
	fn test_console_error_targets_bundle() {
		let (reporter, mut receiver) = ErrorCapture::channel();

		assert!(reporter.report_console_error("w", &[ComponentFrame::new(Some("A"), "A.js", 1)]));

		let report = receiver.rx.try_recv().unwrap();
		assert!(!report.unhandled_rejection);
		assert_eq!(report.error.unmap_source.as_deref(), Some(DEFAULT_BUNDLE_URL));
		assert_eq!(report.error.stack.as_deref(), Some("in A (at A.js:1)\n"));
	}

	#[test]
	fn test_reporter_detects_closed_receiver() {
		let (reporter, receiver) = ErrorCapture::channel_for("/main.js");
		drop(receiver);

		assert!(reporter.is_closed());
		assert!(!reporter.report_rejection(CapturedError::new("x", "y")));
	}
}
