// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Arbitrary Kubernetes objects applied from a manifest: CRDs, secrets,
//! config maps and operator custom resources.
//!
//! Params:
//! - `resource` (required): kubectl resource type, e.g. `opsmanagers.mongodb.com`
//! - `manifest_url`: applied when there is no inline manifest
//! - `ready_jsonpath` / `ready_value`: readiness condition; without them the
//!   object is ready as soon as it exists

use std::sync::Arc;

use async_trait::async_trait;
use stagehand_core::{DriverError, DriverResult, Observation, ResourceDriver, ResourceSpec};
use tracing::{info, warn};

use crate::command::CommandRunner;
use crate::kubectl::{dump_sections, Kubectl, KUBECTL};

pub(crate) fn resource_type(spec: &ResourceSpec) -> DriverResult<&str> {
	spec
		.param("resource")
		.ok_or_else(|| DriverError::invalid_spec(format!("{} has no `resource` param", spec.id())))
}

/// Applies the inline manifest if present, else the manifest URL.
pub(crate) async fn apply_manifest(kubectl: &Kubectl, spec: &ResourceSpec) -> DriverResult<()> {
	let namespace = spec.namespace.as_deref();
	match (&spec.desired_config, spec.param("manifest_url")) {
		(Some(manifest), _) => kubectl.apply_stdin(namespace, manifest).await,
		(None, Some(url)) => kubectl.apply_url(namespace, url).await,
		(None, None) => Err(DriverError::invalid_spec(format!(
			"{} has neither a manifest nor a manifest_url",
			spec.id()
		))),
	}
}

pub struct ManifestDriver {
	kubectl: Kubectl,
}

impl ManifestDriver {
	pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
		Self {
			kubectl: Kubectl::new(runner),
		}
	}
}

#[async_trait]
impl ResourceDriver for ManifestDriver {
	fn name(&self) -> &'static str {
		"manifest"
	}

	fn required_tools(&self) -> Vec<&str> {
		vec![KUBECTL]
	}

	async fn exists(&self, spec: &ResourceSpec) -> DriverResult<bool> {
		let resource = resource_type(spec)?;
		self
			.kubectl
			.exists(resource, &spec.name, spec.namespace.as_deref())
			.await
	}

	async fn create(&self, spec: &ResourceSpec) -> DriverResult<()> {
		info!(resource = %spec.id(), "applying manifest");
		apply_manifest(&self.kubectl, spec).await
	}

	async fn is_ready(&self, spec: &ResourceSpec) -> DriverResult<Observation> {
		let resource = resource_type(spec)?;
		let Some(path) = spec.param("ready_jsonpath") else {
			let present = self.exists(spec).await?;
			return Ok(if present {
				Observation::ready("Present")
			} else {
				Observation::pending("Absent")
			});
		};

		let value = self
			.kubectl
			.jsonpath(resource, &spec.name, spec.namespace.as_deref(), path)
			.await?;
		let expected = spec.param("ready_value").unwrap_or("True");
		let state = if value.is_empty() { "Pending".to_string() } else { value };
		Ok(Observation {
			ready: state == expected,
			state,
		})
	}

	async fn delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		let resource = resource_type(spec)?;
		self
			.kubectl
			.delete(resource, &spec.name, spec.namespace.as_deref())
			.await
	}

	async fn force_delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		let resource = resource_type(spec)?;
		let namespace = spec.namespace.as_deref();
		warn!(resource = %spec.id(), "removing finalizers from stuck object");
		if let Err(e) = self.kubectl.clear_finalizers(resource, &spec.name, namespace).await {
			warn!(resource = %spec.id(), error = %e, "finalizer patch failed, deleting anyway");
		}
		self.kubectl.delete(resource, &spec.name, namespace).await
	}

	async fn diagnostics(&self, spec: &ResourceSpec) -> DriverResult<String> {
		let resource = resource_type(spec)?;
		let namespace = spec.namespace.as_deref();
		let mut sections = vec![(
			"describe",
			self.kubectl.describe(resource, &spec.name, namespace).await,
		)];
		if let Some(ns) = namespace {
			sections.push(("events", self.kubectl.events(ns).await));
		}
		Ok(dump_sections(sections))
	}
}
