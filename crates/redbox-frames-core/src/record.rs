// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Captured errors and the records handed to a renderer.

use serde::{Deserialize, Serialize};

use crate::frame::StackFrame;

/// An error value as delivered by error capture.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedError {
	pub message: String,
	/// Engine-format stack text, header line included.
	pub stack: Option<String>,
	/// Bundle URL to resolve against when the frames carry original positions
	/// (component warnings) rather than compiled ones.
	pub unmap_source: Option<String>,
}

impl CapturedError {
	pub fn new(message: impl Into<String>, stack: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			stack: Some(stack.into()),
			unmap_source: None,
		}
	}

	pub fn with_unmap_source(mut self, bundle_url: impl Into<String>) -> Self {
		self.unmap_source = Some(bundle_url.into());
		self
	}

	/// Text to parse for frames: the stack when present, else the message.
	pub fn stack_text(&self) -> &str {
		self.stack.as_deref().unwrap_or(&self.message)
	}
}

/// A resolved error ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
	pub error: CapturedError,
	pub unhandled_rejection: bool,
	pub context_size: usize,
	pub stack_frames: Vec<StackFrame>,
}
