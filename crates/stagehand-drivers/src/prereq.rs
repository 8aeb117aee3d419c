// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use stagehand_core::{DriverError, ToolCheck};
use tracing::{debug, warn};

use crate::command::CommandRunner;

/// Probes a tool by asking it for its version.
pub struct CommandToolCheck {
	runner: Arc<dyn CommandRunner>,
}

impl CommandToolCheck {
	pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
		Self { runner }
	}
}

fn version_args(tool: &str) -> &'static [&'static str] {
	match tool {
		// `kubectl --version` is not a flag; `version` alone contacts the API server.
		"kubectl" => &["version", "--client"],
		"kind" => &["version"],
		_ => &["--version"],
	}
}

#[async_trait]
impl ToolCheck for CommandToolCheck {
	/// Any completed process counts as available: only a binary that cannot be
	/// started is missing.
	async fn is_available(&self, tool: &str) -> bool {
		match self.runner.run(tool, version_args(tool), None).await {
			Ok(out) => {
				debug!(tool, status = ?out.status, "tool present");
				true
			}
			Err(DriverError::ToolNotFound { .. }) => false,
			Err(e) => {
				warn!(tool, error = %e, "could not run tool");
				false
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::command::testing::ScriptedRunner;
	use crate::command::CommandOutput;

	#[tokio::test]
	async fn missing_binary_is_unavailable() {
		let runner = Arc::new(ScriptedRunner::new().missing("kind", "kind"));
		assert!(!CommandToolCheck::new(runner).is_available("kind").await);
	}

	#[tokio::test]
	async fn failing_version_still_counts_as_installed() {
		let runner = Arc::new(ScriptedRunner::new().reply("yum --version", CommandOutput::failed(1, "")));
		assert!(CommandToolCheck::new(runner).is_available("yum").await);
	}

	#[tokio::test]
	async fn kubectl_checked_client_side_only() {
		let runner = Arc::new(ScriptedRunner::new());
		CommandToolCheck::new(runner.clone()).is_available("kubectl").await;
		assert_eq!(runner.lines(), vec!["kubectl version --client"]);
	}
}
