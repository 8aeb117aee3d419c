// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Local Kubernetes clusters managed with `kind`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use stagehand_core::{DriverError, DriverResult, Observation, ResourceDriver, ResourceSpec};
use tracing::{debug, info, warn};

use crate::command::CommandRunner;
use crate::kubectl::{dump_sections, Kubectl, KUBECTL};

const KIND: &str = "kind";

/// Label kind puts on every node container of a cluster.
const CLUSTER_LABEL: &str = "io.x-k8s.kind.cluster";

#[derive(Debug, Default, Deserialize)]
struct NodeList {
	#[serde(default)]
	items: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Node {
	#[serde(default)]
	status: NodeStatus,
}

#[derive(Debug, Default, Deserialize)]
struct NodeStatus {
	#[serde(default)]
	conditions: Vec<NodeCondition>,
}

#[derive(Debug, Deserialize)]
struct NodeCondition {
	#[serde(rename = "type")]
	kind: String,
	status: String,
}

impl Node {
	fn is_ready(&self) -> bool {
		self
			.status
			.conditions
			.iter()
			.any(|c| c.kind == "Ready" && c.status == "True")
	}
}

/// Reads `kubectl get nodes -o json`: ready once at least one node exists and
/// every node reports `Ready=True`.
pub fn node_readiness(json: &str) -> DriverResult<Observation> {
	let nodes: NodeList =
		serde_json::from_str(json).map_err(|e| DriverError::parse("node list", e.to_string()))?;
	let total = nodes.items.len();
	let ready = nodes.items.iter().filter(|n| n.is_ready()).count();
	Ok(Observation {
		ready: total > 0 && ready == total,
		state: format!("{ready}/{total} nodes Ready"),
	})
}

/// `cluster` resources. The desired config, when present, is the kind
/// cluster config and is passed on stdin. `params.image` selects the node image.
pub struct KindClusterDriver {
	runner: Arc<dyn CommandRunner>,
	container_runtime: String,
}

impl KindClusterDriver {
	pub fn new(runner: Arc<dyn CommandRunner>, container_runtime: impl Into<String>) -> Self {
		Self {
			runner,
			container_runtime: container_runtime.into(),
		}
	}

	fn kubectl(&self, cluster: &str) -> Kubectl {
		Kubectl::new(self.runner.clone()).with_context(format!("kind-{cluster}"))
	}
}

#[async_trait]
impl ResourceDriver for KindClusterDriver {
	fn name(&self) -> &'static str {
		"kind"
	}

	fn required_tools(&self) -> Vec<&str> {
		vec![KIND, KUBECTL, self.container_runtime.as_str()]
	}

	async fn exists(&self, spec: &ResourceSpec) -> DriverResult<bool> {
		let out = self.runner.run_checked(KIND, &["get", "clusters"], None).await?;
		Ok(out.lines().any(|line| line.trim() == spec.name))
	}

	async fn create(&self, spec: &ResourceSpec) -> DriverResult<()> {
		let mut args = vec!["create", "cluster", "--name", spec.name.as_str()];
		if let Some(image) = spec.param("image") {
			args.extend(["--image", image]);
		}
		if spec.desired_config.is_some() {
			args.extend(["--config", "-"]);
		}
		info!(cluster = %spec.name, "creating kind cluster");
		self
			.runner
			.run_checked(KIND, &args, spec.desired_config.as_deref())
			.await?;
		Ok(())
	}

	async fn is_ready(&self, spec: &ResourceSpec) -> DriverResult<Observation> {
		let json = self
			.kubectl(&spec.name)
			.run(None, &["get", "nodes", "-o", "json"], None)
			.await?;
		node_readiness(&json)
	}

	async fn delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		info!(cluster = %spec.name, "deleting kind cluster");
		self
			.runner
			.run_checked(KIND, &["delete", "cluster", "--name", spec.name.as_str()], None)
			.await?;
		Ok(())
	}

	async fn force_delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		let runtime = self.container_runtime.as_str();
		let filter = format!("label={CLUSTER_LABEL}={}", spec.name);
		let ids = self
			.runner
			.run_checked(runtime, &["ps", "-a", "-q", "--filter", filter.as_str()], None)
			.await?;
		let ids: Vec<&str> = ids.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
		if ids.is_empty() {
			debug!(cluster = %spec.name, "no node containers left to remove");
			return Ok(());
		}

		warn!(cluster = %spec.name, containers = ids.len(), "force-removing kind node containers");
		let mut args = vec!["rm", "-f", "--volumes"];
		args.extend(ids);
		self.runner.run_checked(runtime, &args, None).await?;
		Ok(())
	}

	async fn diagnostics(&self, spec: &ResourceSpec) -> DriverResult<String> {
		let kubectl = self.kubectl(&spec.name);
		let nodes = kubectl.run(None, &["get", "nodes", "-o", "wide"], None).await;
		let pods = kubectl.run(None, &["get", "pods", "-A"], None).await;
		Ok(dump_sections(vec![("nodes", nodes), ("pods", pods)]))
	}
}
