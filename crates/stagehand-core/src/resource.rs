// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Declarative description of the external resources a run manages.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default readiness budget when a spec does not override it.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(300);
/// Default interval between readiness probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// The family of external resource. Each kind is served by exactly one driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
	Cluster,
	Namespace,
	CustomResource,
	Container,
	Service,
	Package,
}

impl ResourceKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Cluster => "cluster",
			Self::Namespace => "namespace",
			Self::CustomResource => "custom-resource",
			Self::Container => "container",
			Self::Service => "service",
			Self::Package => "package",
		}
	}
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Identity of a resource within a run: (kind, namespace, name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId {
	pub kind: ResourceKind,
	pub namespace: Option<String>,
	pub name: String,
}

impl ResourceId {
	pub fn new(kind: ResourceKind, namespace: Option<&str>, name: impl Into<String>) -> Self {
		Self {
			kind,
			namespace: namespace.map(str::to_string),
			name: name.into(),
		}
	}
}

impl fmt::Display for ResourceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.namespace {
			Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
			None => write!(f, "{}/{}", self.kind, self.name),
		}
	}
}

/// Everything a driver needs to manage one resource.
///
/// `desired_config` is opaque to the engine: a manifest, a cluster config or
/// container arguments depending on the driver. `params` carries driver hints
/// such as the kubectl resource type or a health URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
	pub kind: ResourceKind,
	pub name: String,
	pub namespace: Option<String>,
	pub desired_config: Option<String>,
	pub params: BTreeMap<String, String>,
	pub readiness_timeout: Duration,
	pub poll_interval: Duration,
	/// Overrides the orchestrator's deletion budget for this resource.
	pub deletion_timeout: Option<Duration>,
}

impl ResourceSpec {
	pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
		Self {
			kind,
			name: name.into(),
			namespace: None,
			desired_config: None,
			params: BTreeMap::new(),
			readiness_timeout: DEFAULT_READINESS_TIMEOUT,
			poll_interval: DEFAULT_POLL_INTERVAL,
			deletion_timeout: None,
		}
	}

	pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = Some(namespace.into());
		self
	}

	pub fn with_config(mut self, config: impl Into<String>) -> Self {
		self.desired_config = Some(config.into());
		self
	}

	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.params.insert(key.into(), value.into());
		self
	}

	pub fn with_timeouts(mut self, readiness_timeout: Duration, poll_interval: Duration) -> Self {
		self.readiness_timeout = readiness_timeout;
		self.poll_interval = poll_interval;
		self
	}

	pub fn with_deletion_timeout(mut self, timeout: Duration) -> Self {
		self.deletion_timeout = Some(timeout);
		self
	}

	pub fn id(&self) -> ResourceId {
		ResourceId::new(self.kind, self.namespace.as_deref(), self.name.clone())
	}

	pub fn param(&self, key: &str) -> Option<&str> {
		self.params.get(key).map(String::as_str)
	}
}

/// A single answer from a driver's readiness predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
	pub ready: bool,
	/// Human-readable state, compared across polls to suppress repeated logs.
	pub state: String,
}

impl Observation {
	pub fn ready(state: impl Into<String>) -> Self {
		Self {
			ready: true,
			state: state.into(),
		}
	}

	pub fn pending(state: impl Into<String>) -> Self {
		Self {
			ready: false,
			state: state.into(),
		}
	}
}
