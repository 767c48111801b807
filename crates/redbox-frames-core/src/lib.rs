// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the redbox stack-frame resolution engine.
//!
//! This crate provides the shared vocabulary used by the parser, the source
//! map symbolicator and the orchestrator:
//! - [`RawFrame`]: a call site exactly as it appeared in a stack trace
//! - [`StackFrame`]: a raw frame enriched with original positions and code
//! - [`ScriptLine`]: one line of a code context window
//! - [`CapturedError`] and [`ErrorRecord`]: what flows in from error capture
//!   and out to a renderer

pub mod frame;
pub mod record;

pub use frame::{normalize_function_name, RawFrame, ScriptLine, StackFrame, ANONYMOUS_FUNCTION};
pub use record::{CapturedError, ErrorRecord};
