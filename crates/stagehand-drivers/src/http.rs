// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP health checks used as an extra readiness condition.

use std::time::Duration;

use reqwest::{redirect, Client, StatusCode};
use stagehand_core::{DriverError, DriverResult};
use tracing::debug;

/// Per-request timeout for health checks.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Returns the User-Agent sent with every probe: `stagehand/{version}`.
pub fn user_agent() -> String {
	format!("stagehand/{}", env!("CARGO_PKG_VERSION"))
}

/// Issues a GET and reports whether the endpoint answered acceptably.
///
/// Redirects are not followed: a login page answering `302`/`303` counts as up.
#[derive(Clone, Debug)]
pub struct HttpProbe {
	client: Client,
	/// Overrides [`accepts`] when non-empty.
	accepted: Vec<StatusCode>,
}

impl HttpProbe {
	pub fn new(timeout: Duration) -> DriverResult<Self> {
		let client = Client::builder()
			.user_agent(user_agent())
			.timeout(timeout)
			.redirect(redirect::Policy::none())
			.build()
			.map_err(|e| DriverError::Http(format!("failed to build HTTP client: {e}")))?;
		Ok(Self {
			client,
			accepted: Vec::new(),
		})
	}

	/// Only the listed statuses count as healthy.
	pub fn with_accepted(mut self, statuses: impl IntoIterator<Item = StatusCode>) -> Self {
		self.accepted = statuses.into_iter().collect();
		self
	}

	fn is_accepted(&self, status: StatusCode) -> bool {
		if self.accepted.is_empty() {
			accepts(status)
		} else {
			self.accepted.contains(&status)
		}
	}

	/// Returns the response status, or an error if no response arrived.
	pub async fn status(&self, url: &str) -> DriverResult<StatusCode> {
		let response = self
			.client
			.get(url)
			.send()
			.await
			.map_err(|e| DriverError::Http(format!("GET {url}: {e}")))?;
		let status = response.status();
		debug!(url, status = status.as_u16(), "health probe answered");
		Ok(status)
	}

	/// `Ok(false)` means the server answered with an unacceptable status; an
	/// unreachable server is an error.
	pub async fn is_healthy(&self, url: &str) -> DriverResult<bool> {
		let status = self.status(url).await?;
		Ok(self.is_accepted(status))
	}
}

/// Any 2xx or 3xx answer is healthy.
pub fn accepts(status: StatusCode) -> bool {
	status.is_success() || status.is_redirection()
}
