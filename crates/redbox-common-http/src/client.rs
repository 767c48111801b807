// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP client construction with the redbox User-Agent header.

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// Creates a new HTTP client with the standard redbox User-Agent header.
pub fn new_client() -> reqwest::Result<Client> {
	builder().build()
}

/// Creates a new HTTP client with a request timeout.
///
/// A dev server that stops answering must not hang frame resolution, so
/// fetchers build their client through this.
pub fn new_client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
	builder().timeout(timeout).build()
}

/// Creates a new HTTP client builder with the standard User-Agent header.
///
/// # Example
/// ```ignore
/// let client = redbox_common_http::builder()
///     .connect_timeout(Duration::from_secs(2))
///     .build()?;
/// ```
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Returns the standard redbox User-Agent string.
///
/// Format: `redbox/{os}-{arch}/{version}`
pub fn user_agent() -> String {
	format!(
		"redbox/{}-{}/{}",
		std::env::consts::OS,
		std::env::consts::ARCH,
		env!("CARGO_PKG_VERSION")
	)
}
