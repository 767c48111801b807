// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retry with exponential backoff for transient fetch failures.

use reqwest::StatusCode;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff policy for a retried operation.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
	/// Total attempts including the first one.
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

impl RetryConfig {
	/// A policy that runs the operation exactly once.
	pub fn no_retry() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}

	fn delay_for(&self, attempt: u32) -> Duration {
		let exponential = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
		let capped = exponential.min(self.max_delay.as_secs_f64());

		let delay = if self.jitter {
			capped * (0.5 + fastrand::f64())
		} else {
			capped
		};

		Duration::from_secs_f64(delay)
	}
}

/// Classifies an error as transient.
pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

/// Statuses a dev server returns while it is still compiling or overloaded.
pub fn is_retryable_status(status: StatusCode) -> bool {
	matches!(
		status,
		StatusCode::TOO_MANY_REQUESTS
			| StatusCode::REQUEST_TIMEOUT
			| StatusCode::INTERNAL_SERVER_ERROR
			| StatusCode::BAD_GATEWAY
			| StatusCode::SERVICE_UNAVAILABLE
			| StatusCode::GATEWAY_TIMEOUT
	)
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}
		self.status().is_some_and(is_retryable_status)
	}
}

/// Run `f` until it succeeds, fails permanently, or attempts run out.
///
/// `operation` names the work in log events, typically the URL.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, operation: &str, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Display,
{
	let max_attempts = cfg.max_attempts.max(1);
	let mut attempt = 0;

	loop {
		match f().await {
			Ok(result) => {
				if attempt > 0 {
					debug!(operation, attempts = attempt + 1, "succeeded after retry");
				}
				return Ok(result);
			}
			Err(err) => {
				attempt += 1;

				if !err.is_retryable() {
					debug!(operation, error = %err, attempt, "non-retryable error");
					return Err(err);
				}

				if attempt >= max_attempts {
					warn!(
						operation,
						error = %err,
						attempt,
						max_attempts,
						"max retry attempts exhausted"
					);
					return Err(err);
				}

				let delay = cfg.delay_for(attempt - 1);
				warn!(
					operation,
					error = %err,
					attempt,
					max_attempts,
					delay_ms = delay.as_millis() as u64,
					"retrying after error"
				);

				tokio::time::sleep(delay).await;
			}
		}
	}
}
