// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files, environment variables and
//! command-line overrides.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::StagehandConfigLayer;
use crate::sections::{
	ClusterConfigLayer, KubernetesConfigLayer, LoggingConfigLayer, OpsManagerConfigLayer,
	Platform, PodmanConfigLayer, ReplicaSetConfigLayer, TimeoutsConfigLayer,
};

pub const CONFIG_FILE_NAME: &str = "stagehand.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
	CommandLine = 90,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<StagehandConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<StagehandConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(StagehandConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Picks the explicit path when given, otherwise `./stagehand.toml` if it
	/// exists, otherwise `<config dir>/stagehand/stagehand.toml`.
	pub fn discover(explicit: Option<PathBuf>) -> Self {
		if let Some(path) = explicit {
			return Self::new(path);
		}

		let local = PathBuf::from(CONFIG_FILE_NAME);
		if local.exists() {
			return Self::new(local);
		}

		match dirs::config_dir() {
			Some(dir) => Self::new(dir.join("stagehand").join(CONFIG_FILE_NAME)),
			None => Self::new(local),
		}
	}

	pub fn path(&self) -> &std::path::Path {
		&self.path
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<StagehandConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(StagehandConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: StagehandConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: STAGEHAND_<SECTION>_<FIELD>
pub struct EnvSource {
	vars: Option<HashMap<String, String>>,
}

impl EnvSource {
	/// Reads the process environment.
	pub fn new() -> Self {
		Self { vars: None }
	}

	/// Reads from a fixed set of variables instead of the process environment.
	pub fn from_vars(vars: HashMap<String, String>) -> Self {
		Self { vars: Some(vars) }
	}

	fn var(&self, name: &str) -> Option<String> {
		let value = match &self.vars {
			Some(vars) => vars.get(name).cloned(),
			None => std::env::var(name).ok(),
		};
		value.filter(|s| !s.is_empty())
	}

	fn parsed<T: FromStr>(&self, name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
		match self.var(name) {
			Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
				key: name.to_string(),
				message: format!("invalid {kind} value '{v}'"),
			}),
			None => Ok(None),
		}
	}

	fn u16(&self, name: &str) -> Result<Option<u16>, ConfigError> {
		self.parsed(name, "u16")
	}

	fn u32(&self, name: &str) -> Result<Option<u32>, ConfigError> {
		self.parsed(name, "u32")
	}

	fn u64(&self, name: &str) -> Result<Option<u64>, ConfigError> {
		self.parsed(name, "u64")
	}

	fn platform(&self) -> Result<Option<Platform>, ConfigError> {
		match self.var("STAGEHAND_PLATFORM") {
			Some(v) => v.parse().map(Some).map_err(|e| match e {
				ConfigError::InvalidValue { message, .. } => ConfigError::InvalidValue {
					key: "STAGEHAND_PLATFORM".to_string(),
					message,
				},
				other => other,
			}),
			None => Ok(None),
		}
	}

	fn cluster(&self) -> ClusterConfigLayer {
		ClusterConfigLayer {
			name: self.var("STAGEHAND_CLUSTER_NAME"),
			node_image: self.var("STAGEHAND_CLUSTER_NODE_IMAGE"),
			container_runtime: self.var("STAGEHAND_CLUSTER_CONTAINER_RUNTIME"),
		}
	}

	fn kubernetes(&self) -> KubernetesConfigLayer {
		KubernetesConfigLayer {
			namespace: self.var("STAGEHAND_KUBERNETES_NAMESPACE"),
			operator_version: self.var("STAGEHAND_KUBERNETES_OPERATOR_VERSION"),
			crds_url: self.var("STAGEHAND_KUBERNETES_CRDS_URL"),
			operator_url: self.var("STAGEHAND_KUBERNETES_OPERATOR_URL"),
		}
	}

	fn ops_manager(&self) -> Result<OpsManagerConfigLayer, ConfigError> {
		Ok(OpsManagerConfigLayer {
			name: self.var("STAGEHAND_OPS_MANAGER_NAME"),
			version: self.var("STAGEHAND_OPS_MANAGER_VERSION"),
			admin_user: self.var("STAGEHAND_OPS_MANAGER_ADMIN_USER"),
			admin_password: self.var("STAGEHAND_OPS_MANAGER_ADMIN_PASSWORD"),
			port: self.u16("STAGEHAND_OPS_MANAGER_PORT")?,
			app_db_members: self.u32("STAGEHAND_OPS_MANAGER_APP_DB_MEMBERS")?,
		})
	}

	fn replica_set(&self) -> Result<ReplicaSetConfigLayer, ConfigError> {
		Ok(ReplicaSetConfigLayer {
			name: self.var("STAGEHAND_REPLICA_SET_NAME"),
			members: self.u32("STAGEHAND_REPLICA_SET_MEMBERS")?,
			version: self.var("STAGEHAND_REPLICA_SET_VERSION"),
			port: self.u16("STAGEHAND_REPLICA_SET_PORT")?,
		})
	}

	fn podman(&self) -> PodmanConfigLayer {
		PodmanConfigLayer {
			server_image: self.var("STAGEHAND_PODMAN_SERVER_IMAGE"),
			ops_manager_image: self.var("STAGEHAND_PODMAN_OPS_MANAGER_IMAGE"),
			network: self.var("STAGEHAND_PODMAN_NETWORK"),
			shell_package: self.var("STAGEHAND_PODMAN_SHELL_PACKAGE"),
		}
	}

	fn timeouts(&self) -> Result<TimeoutsConfigLayer, ConfigError> {
		Ok(TimeoutsConfigLayer {
			poll_interval_secs: self.u64("STAGEHAND_TIMEOUTS_POLL_INTERVAL_SECS")?,
			cluster_secs: self.u64("STAGEHAND_TIMEOUTS_CLUSTER_SECS")?,
			namespace_secs: self.u64("STAGEHAND_TIMEOUTS_NAMESPACE_SECS")?,
			crds_secs: self.u64("STAGEHAND_TIMEOUTS_CRDS_SECS")?,
			operator_secs: self.u64("STAGEHAND_TIMEOUTS_OPERATOR_SECS")?,
			ops_manager_secs: self.u64("STAGEHAND_TIMEOUTS_OPS_MANAGER_SECS")?,
			replica_set_secs: self.u64("STAGEHAND_TIMEOUTS_REPLICA_SET_SECS")?,
			container_secs: self.u64("STAGEHAND_TIMEOUTS_CONTAINER_SECS")?,
			package_secs: self.u64("STAGEHAND_TIMEOUTS_PACKAGE_SECS")?,
			deletion_secs: self.u64("STAGEHAND_TIMEOUTS_DELETION_SECS")?,
			force_secs: self.u64("STAGEHAND_TIMEOUTS_FORCE_SECS")?,
		})
	}

	fn logging(&self) -> LoggingConfigLayer {
		LoggingConfigLayer {
			level: self.var("STAGEHAND_LOGGING_LEVEL"),
			dir: self.var("STAGEHAND_LOGGING_DIR").map(PathBuf::from),
		}
	}
}

impl Default for EnvSource {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<StagehandConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(StagehandConfigLayer {
			platform: self.platform()?,
			cluster: Some(self.cluster()),
			kubernetes: Some(self.kubernetes()),
			ops_manager: Some(self.ops_manager()?),
			replica_set: Some(self.replica_set()?),
			podman: Some(self.podman()),
			timeouts: Some(self.timeouts()?),
			logging: Some(self.logging()),
		})
	}
}

/// Values given on the command line.
pub struct OverrideSource(pub StagehandConfigLayer);

impl ConfigSource for OverrideSource {
	fn name(&self) -> &'static str {
		"command-line"
	}

	fn precedence(&self) -> Precedence {
		Precedence::CommandLine
	}

	fn load(&self) -> Result<StagehandConfigLayer, ConfigError> {
		debug!("applying command-line overrides");
		Ok(self.0.clone())
	}
}
