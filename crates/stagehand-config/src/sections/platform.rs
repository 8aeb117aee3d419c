// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Target platform selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Where the demo environment is provisioned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
	/// Operator-managed deployment on a local kind cluster.
	#[default]
	Kind,
	/// Plain podman containers on the host.
	Podman,
}

impl Platform {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Kind => "kind",
			Self::Podman => "podman",
		}
	}
}

impl fmt::Display for Platform {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Platform {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"kind" => Ok(Self::Kind),
			"podman" => Ok(Self::Podman),
			other => Err(ConfigError::InvalidValue {
				key: "platform".to_string(),
				message: format!("unknown platform '{other}', expected 'kind' or 'podman'"),
			}),
		}
	}
}
