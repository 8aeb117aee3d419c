// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Waiting on a driver's readiness predicate.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::driver::ResourceDriver;
use crate::error::DriverError;
use crate::poller::RetryPoller;
use crate::resource::ResourceSpec;

/// Outcome of a readiness wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessResult {
	pub ready: bool,
	pub last_observed_state: Option<String>,
	pub elapsed: Duration,
	/// Number of probe attempts, including ones that errored.
	pub attempts: u32,
	/// Captured only when the wait timed out.
	pub diagnostics: Option<String>,
}

struct StateTracker<C> {
	last: Option<String>,
	attempts: u32,
	on_change: C,
}

impl<C: FnMut(&str)> StateTracker<C> {
	fn observe(&mut self, state: &str) {
		if self.last.as_deref() != Some(state) {
			(self.on_change)(state);
			self.last = Some(state.to_string());
		}
	}
}

/// Polls [`ResourceDriver::is_ready`] using the resource's timeout and interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadinessWaiter;

impl ReadinessWaiter {
	pub fn new() -> Self {
		Self
	}

	/// Waits until the driver reports the resource ready or the budget runs out.
	///
	/// `on_state_change` fires only when the observed state differs from the
	/// previous one, so a caller logging from it prints `2/3 Ready` once rather
	/// than once per poll. On timeout the driver's diagnostics are captured; a
	/// failing capture is recorded in place of the dump and never changes the
	/// result.
	pub async fn wait_ready<C>(
		&self,
		spec: &ResourceSpec,
		driver: &dyn ResourceDriver,
		on_state_change: C,
	) -> ReadinessResult
	where
		C: FnMut(&str) + Send,
	{
		let poller = RetryPoller::new(spec.readiness_timeout, spec.poll_interval);
		let tracker = Mutex::new(StateTracker {
			last: None,
			attempts: 0,
			on_change: on_state_change,
		});
		let start = Instant::now();

		let ready = {
			let tracker = &tracker;
			poller
				.poll(move || async move {
					tracker.lock().await.attempts += 1;
					let observation = driver.is_ready(spec).await?;
					tracker.lock().await.observe(&observation.state);
					Ok::<_, DriverError>(observation.ready)
				})
				.await
		};
		let elapsed = start.elapsed();
		let tracker = tracker.into_inner();

		let diagnostics = if ready {
			None
		} else {
			debug!(resource = %spec.id(), driver = driver.name(), "capturing diagnostics after timeout");
			match driver.diagnostics(spec).await {
				Ok(dump) => Some(dump),
				Err(e) => {
					warn!(resource = %spec.id(), error = %e, "diagnostic capture failed");
					Some(format!("diagnostics unavailable: {e}"))
				}
			}
		};

		ReadinessResult {
			ready,
			last_observed_state: tracker.last,
			elapsed,
			attempts: tracker.attempts,
			diagnostics,
		}
	}
}
