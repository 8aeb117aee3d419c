// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Bounded-time polling with a fixed interval.
//!
//! Unlike a backoff retry, the interval never grows: the budget is wall-clock
//! time measured from the first probe, so interval and timeout are independent
//! knobs. Probe errors count as a failed attempt and are never surfaced.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Repeatedly runs a probe until it succeeds or the time budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPoller {
	pub timeout: Duration,
	pub interval: Duration,
}

impl RetryPoller {
	pub fn new(timeout: Duration, interval: Duration) -> Self {
		Self { timeout, interval }
	}

	/// Returns `true` on the first probe that yields `Ok(true)`.
	///
	/// Returns `false` once at least `timeout` has elapsed since the first
	/// attempt. Because the check happens after each attempt, a probe that never
	/// succeeds gives up within `[timeout, timeout + interval)`.
	pub async fn poll<F, Fut, E>(&self, mut probe: F) -> bool
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<bool, E>>,
	{
		let start = Instant::now();

		loop {
			if let Ok(true) = probe().await {
				return true;
			}

			if start.elapsed() >= self.timeout {
				return false;
			}

			tokio::time::sleep(self.interval).await;
		}
	}
}
