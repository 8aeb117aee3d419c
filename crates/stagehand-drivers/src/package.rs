// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Host packages installed with yum and queried with rpm.

use std::sync::Arc;

use async_trait::async_trait;
use stagehand_core::{DriverResult, Observation, ResourceDriver, ResourceSpec};
use tracing::{info, warn};

use crate::command::CommandRunner;
use crate::kubectl::dump_sections;

const RPM: &str = "rpm";
const YUM: &str = "yum";

/// `package` resources, named by their rpm package name.
pub struct PackageDriver {
	runner: Arc<dyn CommandRunner>,
}

impl PackageDriver {
	pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
		Self { runner }
	}
}

#[async_trait]
impl ResourceDriver for PackageDriver {
	fn name(&self) -> &'static str {
		"package"
	}

	fn required_tools(&self) -> Vec<&str> {
		vec![RPM, YUM]
	}

	async fn exists(&self, spec: &ResourceSpec) -> DriverResult<bool> {
		let out = self.runner.run(RPM, &["-q", spec.name.as_str()], None).await?;
		Ok(out.success())
	}

	async fn create(&self, spec: &ResourceSpec) -> DriverResult<()> {
		info!(package = %spec.name, "installing package");
		self
			.runner
			.run_checked(YUM, &["install", "-y", spec.name.as_str()], None)
			.await?;
		Ok(())
	}

	/// Installed means ready; the state is the installed version string.
	async fn is_ready(&self, spec: &ResourceSpec) -> DriverResult<Observation> {
		let out = self.runner.run(RPM, &["-q", spec.name.as_str()], None).await?;
		let first_line = out.stdout.lines().next().unwrap_or_default().trim().to_string();
		Ok(if out.success() {
			Observation::ready(first_line)
		} else {
			Observation::pending("not installed")
		})
	}

	async fn delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		self
			.runner
			.run_checked(YUM, &["remove", "-y", spec.name.as_str()], None)
			.await?;
		Ok(())
	}

	async fn force_delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		warn!(package = %spec.name, "removing package ignoring dependencies");
		self
			.runner
			.run_checked(RPM, &["-e", "--nodeps", spec.name.as_str()], None)
			.await?;
		Ok(())
	}

	async fn diagnostics(&self, spec: &ResourceSpec) -> DriverResult<String> {
		let info = self
			.runner
			.run_checked(YUM, &["info", spec.name.as_str()], None)
			.await;
		let repos = self.runner.run_checked(YUM, &["repolist"], None).await;
		Ok(dump_sections(vec![("package", info), ("repositories", repos)]))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::command::testing::ScriptedRunner;
	use crate::command::CommandOutput;
	use stagehand_core::ResourceKind;

	fn spec() -> ResourceSpec {
		ResourceSpec::new(ResourceKind::Package, "mongodb-mongosh")
	}

	#[tokio::test]
	async fn rpm_query_decides_existence() {
		let runner = Arc::new(
			ScriptedRunner::new()
				.reply("rpm -q", CommandOutput::failed(1, ""))
				.reply("rpm -q", CommandOutput::ok("mongodb-mongosh-2.2.10-1.el8.x86_64\n")),
		);
		let driver = PackageDriver::new(runner);
		assert!(!driver.exists(&spec()).await.unwrap());
		assert!(driver.exists(&spec()).await.unwrap());
	}

	#[tokio::test]
	async fn ready_state_is_installed_version() {
		let runner = Arc::new(
			ScriptedRunner::new().reply("rpm -q", CommandOutput::ok("mongodb-mongosh-2.2.10-1.el8.x86_64\n")),
		);
		let obs = PackageDriver::new(runner).is_ready(&spec()).await.unwrap();
		assert_eq!(obs, Observation::ready("mongodb-mongosh-2.2.10-1.el8.x86_64"));
	}

	#[tokio::test]
	async fn install_failure_is_reported() {
		let runner = Arc::new(ScriptedRunner::new().reply(
			"yum install",
			CommandOutput::failed(1, "No match for argument: mongodb-mongosh"),
		));
		let err = PackageDriver::new(runner).create(&spec()).await.unwrap_err();
		assert_eq!(
			err.to_string(),
			"yum install -y mongodb-mongosh failed: No match for argument: mongodb-mongosh"
		);
	}
}
