// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Podman platform configuration section.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PodmanConfigLayer {
	pub server_image: Option<String>,
	pub ops_manager_image: Option<String>,
	pub network: Option<String>,
	pub shell_package: Option<String>,
}

impl PodmanConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.server_image.is_some() {
			self.server_image = other.server_image;
		}
		if other.ops_manager_image.is_some() {
			self.ops_manager_image = other.ops_manager_image;
		}
		if other.network.is_some() {
			self.network = other.network;
		}
		if other.shell_package.is_some() {
			self.shell_package = other.shell_package;
		}
	}

	pub fn finalize(self) -> PodmanConfig {
		PodmanConfig {
			server_image: self
				.server_image
				.unwrap_or_else(|| "quay.io/mongodb/mongodb-enterprise-server".to_string()),
			ops_manager_image: self
				.ops_manager_image
				.unwrap_or_else(|| "quay.io/mongodb/mongodb-enterprise-ops-manager-ubi8".to_string()),
			network: self.network.unwrap_or_else(|| "host".to_string()),
			shell_package: self.shell_package.unwrap_or_else(|| "mongodb-mongosh".to_string()),
		}
	}
}

/// Image repositories are tagged with the configured versions at plan time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PodmanConfig {
	/// Used for the application database and replica set members.
	pub server_image: String,
	pub ops_manager_image: String,
	/// Passed to `--network`; the default `host` lets the containers reach each
	/// other on localhost.
	pub network: String,
	/// Host package providing the MongoDB shell.
	pub shell_package: String,
}

impl Default for PodmanConfig {
	fn default() -> Self {
		PodmanConfigLayer::default().finalize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_values() {
		let config = PodmanConfig::default();
		assert_eq!(config.network, "host");
		assert_eq!(config.shell_package, "mongodb-mongosh");
		assert!(config.server_image.starts_with("quay.io/mongodb/"));
	}

	#[test]
	fn test_deserialize_layer_empty() {
		let layer: PodmanConfigLayer = toml::from_str("").unwrap();
		assert_eq!(layer, PodmanConfigLayer::default());
	}
}
