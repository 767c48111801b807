// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for source map parsing.

use thiserror::Error;

/// Errors that can occur while parsing a source map.
#[derive(Debug, Error)]
pub enum SymbolicateError {
	#[error("Invalid source map JSON: {0}")]
	InvalidSourceMapJson(#[from] serde_json::Error),

	#[error("Invalid source map version: expected 3, got {0}")]
	InvalidSourceMapVersion(u32),

	#[error("Invalid VLQ character: {0}")]
	InvalidVlqChar(char),

	#[error("VLQ value overflows 32 bits in segment {0:?}")]
	VlqOverflow(String),

	#[error("Invalid mapping segment with {0} fields")]
	InvalidSegmentLength(usize),

	#[error("Mapping decodes to a negative {0}")]
	NegativePosition(&'static str),

	#[error("Invalid source index: {0}")]
	InvalidSourceIndex(u32),

	#[error("Invalid name index: {0}")]
	InvalidNameIndex(u32),
}

pub type Result<T> = std::result::Result<T, SymbolicateError>;
