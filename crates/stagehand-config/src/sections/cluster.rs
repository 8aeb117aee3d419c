// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Local cluster configuration section.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CLUSTER_NAME: &str = "mongodb-demo";
pub const DEFAULT_CONTAINER_RUNTIME: &str = "podman";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterConfigLayer {
	pub name: Option<String>,
	pub node_image: Option<String>,
	pub container_runtime: Option<String>,
}

impl ClusterConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.name.is_some() {
			self.name = other.name;
		}
		if other.node_image.is_some() {
			self.node_image = other.node_image;
		}
		if other.container_runtime.is_some() {
			self.container_runtime = other.container_runtime;
		}
	}

	pub fn finalize(self) -> ClusterConfig {
		ClusterConfig {
			name: self.name.unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string()),
			node_image: self.node_image,
			container_runtime: self
				.container_runtime
				.unwrap_or_else(|| DEFAULT_CONTAINER_RUNTIME.to_string()),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterConfig {
	pub name: String,
	/// kind node image; kind's built-in default when unset.
	pub node_image: Option<String>,
	/// CLI that runs the kind node containers.
	pub container_runtime: String,
}

impl ClusterConfig {
	/// kubeconfig context kind creates for this cluster.
	pub fn context(&self) -> String {
		format!("kind-{}", self.name)
	}
}

impl Default for ClusterConfig {
	fn default() -> Self {
		ClusterConfigLayer::default().finalize()
	}
}
