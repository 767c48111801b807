// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bundle and source map fixtures built in memory.

#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use redbox_frames_symbolicate::encode_vlq_segment;

pub const BUNDLE_URL: &str = "/static/js/bundle.js";
pub const VENDOR_URL: &str = "/static/js/vendor.js";

pub const APP_SOURCE: &str = concat!(
	"import React, { Component } from 'react';\n",
	"import logo from './logo.svg';\n",
	"import './App.css';\n",
	"\n",
	"class App extends Component {\n",
	"  render() {\n",
	"    throw new Error('boom');\n",
	"  }\n",
	"}\n",
	"\n",
	"export default App;\n",
);

/// Source map JSON whose only mapping sends generated line 26122 column 21
/// to `webpack:///src/App.js` line 7 column 0.
pub fn app_map_json() -> String {
	let mappings = format!("{}{}", ";".repeat(26121), encode_vlq_segment(&[21, 0, 6, 0]));
	serde_json::json!({
		"version": 3,
		"file": "bundle.js",
		"sources": ["webpack:///src/App.js"],
		"sourcesContent": [APP_SOURCE],
		"names": [],
		"mappings": mappings,
	})
	.to_string()
}

/// Source map for a bundle made only of dependency code.
pub fn vendor_map_json() -> String {
	serde_json::json!({
		"version": 3,
		"sources": ["webpack:///node_modules/react-dom/cjs/react-dom.development.js"],
		"names": [],
		"mappings": format!(";{}", encode_vlq_segment(&[0, 0, 99, 0])),
	})
	.to_string()
}

/// Bundle text with `lines` lines followed by `directive`.
pub fn bundle_with_directive(lines: usize, directive: &str) -> String {
	let mut text = String::new();
	for n in 1..=lines {
		text.push_str(&format!("/* generated line {} */ var a{} = {};\n", n, n, n));
	}
	text.push_str(directive);
	text.push('\n');
	text
}

pub fn external_directive(map_name: &str) -> String {
	format!("//# sourceMappingURL={}", map_name)
}

pub fn inline_directive(map_json: &str) -> String {
	format!(
		"//# sourceMappingURL=data:application/json;charset=utf-8;base64,{}",
		STANDARD.encode(map_json)
	)
}

/// The app bundle with its map inlined.
pub fn app_bundle_inline() -> String {
	bundle_with_directive(26125, &inline_directive(&app_map_json()))
}

/// The app bundle referencing `bundle.js.map` next to it.
pub fn app_bundle_external() -> String {
	bundle_with_directive(26125, &external_directive("bundle.js.map"))
}

pub fn vendor_bundle() -> String {
	bundle_with_directive(5, &inline_directive(&vendor_map_json()))
}

pub fn chrome_stack(frames: &[(&str, &str, u32, u32)]) -> String {
	let mut stack = String::from("Error: boom");
	for (name, file, line, column) in frames {
		stack.push_str(&format!("\n    at {} ({}:{}:{})", name, file, line, column));
	}
	stack
}
