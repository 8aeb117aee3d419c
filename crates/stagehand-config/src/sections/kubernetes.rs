// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Kubernetes operator configuration section.

use serde::{Deserialize, Serialize};

pub const DEFAULT_NAMESPACE: &str = "mongodb";
pub const DEFAULT_OPERATOR_VERSION: &str = "1.27.0";

const OPERATOR_REPO: &str = "https://raw.githubusercontent.com/mongodb/mongodb-enterprise-kubernetes";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct KubernetesConfigLayer {
	pub namespace: Option<String>,
	pub operator_version: Option<String>,
	pub crds_url: Option<String>,
	pub operator_url: Option<String>,
}

impl KubernetesConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.namespace.is_some() {
			self.namespace = other.namespace;
		}
		if other.operator_version.is_some() {
			self.operator_version = other.operator_version;
		}
		if other.crds_url.is_some() {
			self.crds_url = other.crds_url;
		}
		if other.operator_url.is_some() {
			self.operator_url = other.operator_url;
		}
	}

	/// Manifest URLs default to the release tag of `operator_version`.
	pub fn finalize(self) -> KubernetesConfig {
		let operator_version = self
			.operator_version
			.unwrap_or_else(|| DEFAULT_OPERATOR_VERSION.to_string());
		KubernetesConfig {
			namespace: self.namespace.unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
			crds_url: self
				.crds_url
				.unwrap_or_else(|| format!("{OPERATOR_REPO}/{operator_version}/crds.yaml")),
			operator_url: self
				.operator_url
				.unwrap_or_else(|| format!("{OPERATOR_REPO}/{operator_version}/mongodb-enterprise.yaml")),
			operator_version,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KubernetesConfig {
	pub namespace: String,
	pub operator_version: String,
	pub crds_url: String,
	pub operator_url: String,
}

impl Default for KubernetesConfig {
	fn default() -> Self {
		KubernetesConfigLayer::default().finalize()
	}
}
