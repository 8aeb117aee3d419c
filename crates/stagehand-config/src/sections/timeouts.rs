// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Polling interval and per-resource time budgets, in seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimeoutsConfigLayer {
	pub poll_interval_secs: Option<u64>,
	pub cluster_secs: Option<u64>,
	pub namespace_secs: Option<u64>,
	pub crds_secs: Option<u64>,
	pub operator_secs: Option<u64>,
	pub ops_manager_secs: Option<u64>,
	pub replica_set_secs: Option<u64>,
	pub container_secs: Option<u64>,
	pub package_secs: Option<u64>,
	pub deletion_secs: Option<u64>,
	pub force_secs: Option<u64>,
}

impl TimeoutsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.poll_interval_secs.is_some() {
			self.poll_interval_secs = other.poll_interval_secs;
		}
		if other.cluster_secs.is_some() {
			self.cluster_secs = other.cluster_secs;
		}
		if other.namespace_secs.is_some() {
			self.namespace_secs = other.namespace_secs;
		}
		if other.crds_secs.is_some() {
			self.crds_secs = other.crds_secs;
		}
		if other.operator_secs.is_some() {
			self.operator_secs = other.operator_secs;
		}
		if other.ops_manager_secs.is_some() {
			self.ops_manager_secs = other.ops_manager_secs;
		}
		if other.replica_set_secs.is_some() {
			self.replica_set_secs = other.replica_set_secs;
		}
		if other.container_secs.is_some() {
			self.container_secs = other.container_secs;
		}
		if other.package_secs.is_some() {
			self.package_secs = other.package_secs;
		}
		if other.deletion_secs.is_some() {
			self.deletion_secs = other.deletion_secs;
		}
		if other.force_secs.is_some() {
			self.force_secs = other.force_secs;
		}
	}

	pub fn finalize(self) -> TimeoutsConfig {
		TimeoutsConfig {
			poll_interval_secs: self.poll_interval_secs.unwrap_or(10),
			cluster_secs: self.cluster_secs.unwrap_or(300),
			namespace_secs: self.namespace_secs.unwrap_or(60),
			crds_secs: self.crds_secs.unwrap_or(120),
			operator_secs: self.operator_secs.unwrap_or(300),
			ops_manager_secs: self.ops_manager_secs.unwrap_or(1200), // 20 minutes
			replica_set_secs: self.replica_set_secs.unwrap_or(900),   // 15 minutes
			container_secs: self.container_secs.unwrap_or(300),
			package_secs: self.package_secs.unwrap_or(600),
			deletion_secs: self.deletion_secs.unwrap_or(150),
			force_secs: self.force_secs.unwrap_or(30),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeoutsConfig {
	pub poll_interval_secs: u64,
	pub cluster_secs: u64,
	pub namespace_secs: u64,
	pub crds_secs: u64,
	pub operator_secs: u64,
	pub ops_manager_secs: u64,
	pub replica_set_secs: u64,
	pub container_secs: u64,
	pub package_secs: u64,
	/// Plain deletion budget before escalating to a forced delete.
	pub deletion_secs: u64,
	/// Re-poll budget after a forced delete.
	pub force_secs: u64,
}

impl TimeoutsConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_secs(self.poll_interval_secs)
	}

	pub fn deletion(&self) -> Duration {
		Duration::from_secs(self.deletion_secs)
	}

	pub fn force(&self) -> Duration {
		Duration::from_secs(self.force_secs)
	}

	/// Named readiness budgets, for validation and display.
	pub fn readiness_budgets(&self) -> [(&'static str, u64); 8] {
		[
			("cluster_secs", self.cluster_secs),
			("namespace_secs", self.namespace_secs),
			("crds_secs", self.crds_secs),
			("operator_secs", self.operator_secs),
			("ops_manager_secs", self.ops_manager_secs),
			("replica_set_secs", self.replica_set_secs),
			("container_secs", self.container_secs),
			("package_secs", self.package_secs),
		]
	}
}

impl Default for TimeoutsConfig {
	fn default() -> Self {
		TimeoutsConfigLayer::default().finalize()
	}
}
