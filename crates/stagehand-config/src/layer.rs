// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partial configuration produced by a single source.

use serde::{Deserialize, Serialize};

use crate::sections::{
	ClusterConfigLayer, KubernetesConfigLayer, LoggingConfigLayer, OpsManagerConfigLayer,
	Platform, PodmanConfigLayer, ReplicaSetConfigLayer, TimeoutsConfigLayer,
};

/// One layer of configuration. Every field is optional; later layers override
/// earlier ones field by field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StagehandConfigLayer {
	pub platform: Option<Platform>,
	pub cluster: Option<ClusterConfigLayer>,
	pub kubernetes: Option<KubernetesConfigLayer>,
	pub ops_manager: Option<OpsManagerConfigLayer>,
	pub replica_set: Option<ReplicaSetConfigLayer>,
	pub podman: Option<PodmanConfigLayer>,
	pub timeouts: Option<TimeoutsConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
}

fn merge_section<T: Default>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	if let Some(other) = other {
		merge(base.get_or_insert_with(T::default), other);
	}
}

impl StagehandConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.platform.is_some() {
			self.platform = other.platform;
		}
		merge_section(&mut self.cluster, other.cluster, ClusterConfigLayer::merge);
		merge_section(&mut self.kubernetes, other.kubernetes, KubernetesConfigLayer::merge);
		merge_section(&mut self.ops_manager, other.ops_manager, OpsManagerConfigLayer::merge);
		merge_section(&mut self.replica_set, other.replica_set, ReplicaSetConfigLayer::merge);
		merge_section(&mut self.podman, other.podman, PodmanConfigLayer::merge);
		merge_section(&mut self.timeouts, other.timeouts, TimeoutsConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}
