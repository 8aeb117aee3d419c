// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Replicated workloads (deployments and statefulsets), ready by the
//! two-condition rollout rule plus an optional HTTP health check.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use stagehand_core::{DriverResult, Observation, ResourceDriver, ResourceSpec, RolloutStatus};
use tracing::{debug, info, warn};

use crate::command::CommandRunner;
use crate::http::HttpProbe;
use crate::kubectl::{dump_sections, Kubectl, KUBECTL};
use crate::manifest::apply_manifest;

const DEFAULT_WORKLOAD: &str = "deployment";

fn count(value: &Value) -> u32 {
	value.as_u64().map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
}

fn text(value: &Value) -> Option<String> {
	match value {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		_ => None,
	}
}

/// Extracts replica and revision counters from a workload object.
///
/// Statefulsets expose `currentRevision`/`updateRevision` directly.
/// Deployments do not, so the observed generation stands in for the applied
/// revision and `metadata.generation` for the target, and a deployment with
/// replicas still on the old template is reported as mid-rollout.
pub fn rollout_status(workload: &str, object: &Value) -> RolloutStatus {
	let status = &object["status"];
	let replicas = object["spec"]["replicas"]
		.as_u64()
		.map_or(1, |n| u32::try_from(n).unwrap_or(u32::MAX));
	let ready_replicas = count(&status["readyReplicas"]);

	if workload.starts_with("statefulset") {
		return RolloutStatus {
			ready_replicas,
			replicas,
			current_revision: text(&status["currentRevision"]),
			update_revision: text(&status["updateRevision"]),
		};
	}

	let generation = text(&object["metadata"]["generation"]);
	let observed = text(&status["observedGeneration"]);
	let updated = count(&status["updatedReplicas"]);
	let current_revision = if updated == replicas {
		observed
	} else {
		observed.map(|g| format!("{g} (partial)"))
	};
	RolloutStatus {
		ready_replicas,
		replicas,
		current_revision,
		update_revision: generation,
	}
}

/// `service` resources. Params: `resource` (`deployment` or `statefulset`,
/// default `deployment`), `manifest_url`, `health_url`.
pub struct RolloutDriver {
	kubectl: Kubectl,
	probe: HttpProbe,
}

impl RolloutDriver {
	pub fn new(runner: Arc<dyn CommandRunner>, probe: HttpProbe) -> Self {
		Self {
			kubectl: Kubectl::new(runner),
			probe,
		}
	}

	fn workload(spec: &ResourceSpec) -> &str {
		spec.param("resource").unwrap_or(DEFAULT_WORKLOAD)
	}
}

#[async_trait]
impl ResourceDriver for RolloutDriver {
	fn name(&self) -> &'static str {
		"rollout"
	}

	fn required_tools(&self) -> Vec<&str> {
		vec![KUBECTL]
	}

	async fn exists(&self, spec: &ResourceSpec) -> DriverResult<bool> {
		self
			.kubectl
			.exists(Self::workload(spec), &spec.name, spec.namespace.as_deref())
			.await
	}

	async fn create(&self, spec: &ResourceSpec) -> DriverResult<()> {
		info!(resource = %spec.id(), "applying workload");
		apply_manifest(&self.kubectl, spec).await
	}

	async fn is_ready(&self, spec: &ResourceSpec) -> DriverResult<Observation> {
		let workload = Self::workload(spec);
		let Some(object) = self
			.kubectl
			.get_json(workload, &spec.name, spec.namespace.as_deref())
			.await?
		else {
			return Ok(Observation::pending("Absent"));
		};

		let observation = rollout_status(workload, &object).observe();
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
				debug!(resource = %spec.id(), error = %e, "health endpoint unreachable");
				Ok(Observation::pending(format!("{}, health endpoint unreachable", observation.state)))
			}
		}
	}

	async fn delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		self
			.kubectl
			.delete(Self::workload(spec), &spec.name, spec.namespace.as_deref())
			.await
	}

	async fn force_delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		let workload = Self::workload(spec);
		let namespace = spec.namespace.as_deref();
		warn!(resource = %spec.id(), "force-deleting workload");
		if let Err(e) = self.kubectl.clear_finalizers(workload, &spec.name, namespace).await {
			warn!(resource = %spec.id(), error = %e, "finalizer patch failed, deleting anyway");
		}
		self
			.kubectl
			.run(
				namespace,
				&[
					"delete",
					workload,
					spec.name.as_str(),
					"--ignore-not-found",
					"--wait=false",
					"--grace-period=0",
					"--force",
				],
				None,
			)
			.await
			.map(|_| ())
	}

	async fn diagnostics(&self, spec: &ResourceSpec) -> DriverResult<String> {
		let workload = Self::workload(spec);
		let namespace = spec.namespace.as_deref();
		let mut sections = vec![(
			"describe",
			self.kubectl.describe(workload, &spec.name, namespace).await,
		)];
		if let Some(ns) = namespace {
			sections.push((
				"pods",
				self.kubectl.run(Some(ns), &["get", "pods", "-o", "wide"], None).await,
			));
			sections.push(("events", self.kubectl.events(ns).await));
		}
		Ok(dump_sections(sections))
	}
}
