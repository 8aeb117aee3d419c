// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use stagehand_core::{DriverError, DriverResult, Observation, ResourceDriver, ResourceSpec};
use tracing::{info, warn};

use crate::command::CommandRunner;
use crate::kubectl::{dump_sections, Kubectl, KUBECTL};

/// Kubernetes namespaces. Ready once the phase is `Active`.
pub struct NamespaceDriver {
	kubectl: Kubectl,
}

impl NamespaceDriver {
	pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
		Self {
			kubectl: Kubectl::new(runner),
		}
	}
}

/// Empties `spec.finalizers` so the finalize subresource can release a
/// namespace stuck in `Terminating`.
pub fn strip_finalizers(mut namespace: Value) -> DriverResult<Value> {
	let spec = namespace
		.as_object_mut()
		.ok_or_else(|| DriverError::parse("namespace json", "not an object"))?
		.entry("spec")
		.or_insert_with(|| json!({}))
		.as_object_mut()
		.ok_or_else(|| DriverError::parse("namespace json", "spec is not an object"))?;
	spec.insert("finalizers".to_string(), json!([]));
	Ok(namespace)
}

#[async_trait]
impl ResourceDriver for NamespaceDriver {
	fn name(&self) -> &'static str {
		"namespace"
	}

	fn required_tools(&self) -> Vec<&str> {
		vec![KUBECTL]
	}

	async fn exists(&self, spec: &ResourceSpec) -> DriverResult<bool> {
		self.kubectl.exists("namespace", &spec.name, None).await
	}

	async fn create(&self, spec: &ResourceSpec) -> DriverResult<()> {
		info!(namespace = %spec.name, "creating namespace");
		match &spec.desired_config {
			Some(manifest) => self.kubectl.apply_stdin(None, manifest).await,
			None => {
				self
					.kubectl
					.run(None, &["create", "namespace", spec.name.as_str()], None)
					.await?;
				Ok(())
			}
		}
	}

	async fn is_ready(&self, spec: &ResourceSpec) -> DriverResult<Observation> {
		let phase = self
			.kubectl
			.jsonpath("namespace", &spec.name, None, "{.status.phase}")
			.await?;
		let phase = if phase.is_empty() { "Unknown".to_string() } else { phase };
		Ok(Observation {
			ready: phase == "Active",
			state: phase,
		})
	}

	async fn delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		self.kubectl.delete("namespace", &spec.name, None).await
	}

	async fn force_delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		let Some(current) = self.kubectl.get_json("namespace", &spec.name, None).await? else {
			return Ok(());
		};
		warn!(namespace = %spec.name, "finalizing stuck namespace");
		let body = serde_json::to_string(&strip_finalizers(current)?)
			.map_err(|e| DriverError::parse("namespace json", e.to_string()))?;
		let path = format!("/api/v1/namespaces/{}/finalize", spec.name);
		self
			.kubectl
			.run(None, &["replace", "--raw", path.as_str(), "-f", "-"], Some(body.as_str()))
			.await?;
		Ok(())
	}

	async fn diagnostics(&self, spec: &ResourceSpec) -> DriverResult<String> {
		let describe = self.kubectl.describe("namespace", &spec.name, None).await;
		let remaining = self
			.kubectl
			.run(Some(spec.name.as_str()), &["get", "all", "-o", "name"], None)
			.await;
		Ok(dump_sections(vec![("namespace", describe), ("remaining objects", remaining)]))
	}
}
