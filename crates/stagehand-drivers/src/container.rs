// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Standalone containers run with podman (or a compatible CLI).

use std::sync::Arc;

use async_trait::async_trait;
use stagehand_core::{DriverError, DriverResult, Observation, ResourceDriver, ResourceSpec};
use tracing::{debug, info, warn};

use crate::command::CommandRunner;
use crate::http::HttpProbe;
use crate::kubectl::dump_sections;

/// Go template that prints `<state>|<health>`; health is empty without a
/// healthcheck.
const INSPECT_FORMAT: &str = "{{.State.Status}}|{{if .State.Health}}{{.State.Health.Status}}{{end}}";

/// Splits the desired config into `run` arguments: one per line, blank lines
/// and `#` comments ignored.
pub fn run_args(config: &str) -> Vec<&str> {
	config
		.lines()
		.map(str::trim)
		.filter(|l| !l.is_empty() && !l.starts_with('#'))
		.collect()
}

/// Interprets `podman inspect` output produced with [`INSPECT_FORMAT`].
pub fn container_readiness(inspect: &str) -> Observation {
	let (state, health) = inspect.trim().split_once('|').unwrap_or((inspect.trim(), ""));
	let ready = state == "running" && (health.is_empty() || health == "healthy");
	let label = if health.is_empty() {
		state.to_string()
	} else {
		format!("{state} ({health})")
	};
	Observation { ready, state: label }
}

/// `container` resources. The desired config holds the `run` arguments ending
/// with the image; `params.health_url` adds an HTTP readiness check.
pub struct ContainerDriver {
	runner: Arc<dyn CommandRunner>,
	runtime: &'static str,
	probe: HttpProbe,
}

impl ContainerDriver {
	pub fn new(runner: Arc<dyn CommandRunner>, probe: HttpProbe) -> Self {
		Self {
			runner,
			runtime: "podman",
			probe,
		}
	}
}

#[async_trait]
impl ResourceDriver for ContainerDriver {
	fn name(&self) -> &'static str {
		"container"
	}

	fn required_tools(&self) -> Vec<&str> {
		vec![self.runtime]
	}

	async fn exists(&self, spec: &ResourceSpec) -> DriverResult<bool> {
		let args = ["container", "exists", spec.name.as_str()];
		let out = self.runner.run(self.runtime, &args, None).await?;
		match out.status {
			Some(0) => Ok(true),
			Some(1) => Ok(false),
			_ => out.into_stdout(self.runtime, &args).map(|_| false),
		}
	}

	async fn create(&self, spec: &ResourceSpec) -> DriverResult<()> {
		let config = spec.desired_config.as_deref().ok_or_else(|| {
			DriverError::invalid_spec(format!("{} has no run arguments", spec.id()))
		})?;
		let mut args = vec!["run", "-d", "--name", spec.name.as_str()];
		args.extend(run_args(config));
		info!(container = %spec.name, "starting container");
		self.runner.run_checked(self.runtime, &args, None).await?;
		Ok(())
	}

	async fn is_ready(&self, spec: &ResourceSpec) -> DriverResult<Observation> {
		let inspect = self
			.runner
			.run_checked(
				self.runtime,
				&["inspect", spec.name.as_str(), "--format", INSPECT_FORMAT],
				None,
			)
			.await?;
		let observation = container_readiness(&inspect);
		if !observation.ready {
			return Ok(observation);
		}

		let Some(url) = spec.param("health_url") else {
			return Ok(observation);
		};
		match self.probe.is_healthy(url).await {
			Ok(true) => Ok(observation),
			Ok(false) => Ok(Observation::pending(format!("{}, health check failing", observation.state))),
			Err(e) => {
				debug!(container = %spec.name, error = %e, "health endpoint unreachable");
				Ok(Observation::pending(format!("{}, health endpoint unreachable", observation.state)))
			}
		}
	}

	async fn delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		let name = spec.name.as_str();
		self.runner.run_checked(self.runtime, &["stop", name], None).await?;
		self.runner.run_checked(self.runtime, &["rm", name], None).await?;
		Ok(())
	}

	async fn force_delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		warn!(container = %spec.name, "force-removing container and its volumes");
		self
			.runner
			.run_checked(
				self.runtime,
				&["rm", "-f", "--volumes", spec.name.as_str()],
				None,
			)
			.await?;
		Ok(())
	}

	async fn diagnostics(&self, spec: &ResourceSpec) -> DriverResult<String> {
		let name = spec.name.as_str();
		let inspect = self.runner.run_checked(self.runtime, &["inspect", name], None).await;
		let logs = self
			.runner
			.run_checked(self.runtime, &["logs", "--tail", "50", name], None)
			.await;
		Ok(dump_sections(vec![("inspect", inspect), ("logs", logs)]))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::command::testing::ScriptedRunner;
	use crate::command::CommandOutput;
	use proptest::prelude::*;
	use stagehand_core::ResourceKind;
	use std::time::Duration;

	fn driver(runner: Arc<ScriptedRunner>) -> ContainerDriver {
		ContainerDriver::new(runner, HttpProbe::new(Duration::from_secs(1)).unwrap())
	}

	fn spec() -> ResourceSpec {
		ResourceSpec::new(ResourceKind::Container, "om-appdb").with_config(
			"# application database\n--network\nmongodb-demo\n-p\n27017:27017\n\nquay.io/mongodb/mongodb-enterprise-server:7.0.12-ubi8\n",
		)
	}

	#[test]
	fn readiness_from_inspect() {
		assert!(container_readiness("running|").ready);
		assert!(container_readiness("running|healthy").ready);
		assert!(!container_readiness("running|starting").ready);
		assert!(!container_readiness("running|unhealthy").ready);
		assert!(!container_readiness("exited|").ready);
		assert_eq!(container_readiness("running|starting\n").state, "running (starting)");
	}

	#[tokio::test]
	async fn exists_distinguishes_absent_from_failure() {
		let runner = Arc::new(
			ScriptedRunner::new()
				.reply("podman container exists", CommandOutput::failed(1, ""))
				.reply("podman container exists", CommandOutput::failed(125, "cannot connect to podman socket")),
		);
		let driver = driver(runner);
		assert!(!driver.exists(&spec()).await.unwrap());
		assert!(matches!(
			driver.exists(&spec()).await,
			Err(DriverError::CommandFailed { .. })
		));
	}

	#[tokio::test]
	async fn create_passes_config_lines_as_arguments() {
		let runner = Arc::new(ScriptedRunner::new());
		driver(runner.clone()).create(&spec()).await.unwrap();
		assert_eq!(
			runner.lines(),
			vec!["podman run -d --name om-appdb --network mongodb-demo -p 27017:27017 quay.io/mongodb/mongodb-enterprise-server:7.0.12-ubi8"]
		);
	}

	#[tokio::test]
	async fn create_without_config_is_invalid() {
		let spec = ResourceSpec::new(ResourceKind::Container, "bare");
		assert!(matches!(
			driver(Arc::new(ScriptedRunner::new())).create(&spec).await,
			Err(DriverError::InvalidSpec(_))
		));
	}

	#[tokio::test]
	async fn delete_stops_then_removes() {
		let runner = Arc::new(ScriptedRunner::new());
		driver(runner.clone()).delete(&spec()).await.unwrap();
		assert_eq!(runner.lines(), vec!["podman stop om-appdb", "podman rm om-appdb"]);
	}

	proptest! {
		#[test]
		fn prop_run_args_never_blank_or_comment(lines in prop::collection::vec("[ #a-z0-9:-]{0,12}", 0..10)) {
			let config = lines.join("\n");
			for arg in run_args(&config) {
				prop_assert!(!arg.is_empty());
				prop_assert!(!arg.starts_with('#'));
				prop_assert_eq!(arg, arg.trim());
			}
		}
	}
}
