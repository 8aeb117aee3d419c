// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for stagehand.
//!
//! This crate provides:
//! - Layered configuration from defaults, a TOML file, the environment and the command line
//! - Type-safe configuration with validation
//! - Consistent environment variable naming (`STAGEHAND_*`)
//!
//! # Usage
//!
//! ```ignore
//! use stagehand_config::{load_config, StagehandConfigLayer};
//!
//! let config = load_config(None, StagehandConfigLayer::default())?;
//! println!("provisioning on {}", config.platform);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::StagehandConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, OverrideSource, Precedence, TomlSource,
	CONFIG_FILE_NAME,
};

use std::path::Path;

use tracing::{debug, info};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default)]
pub struct StagehandConfig {
	pub platform: Platform,
	pub cluster: ClusterConfig,
	pub kubernetes: KubernetesConfig,
	pub ops_manager: OpsManagerConfig,
	pub replica_set: ReplicaSetConfig,
	pub podman: PodmanConfig,
	pub timeouts: TimeoutsConfig,
	pub logging: LoggingConfig,
}

/// Load configuration from all sources with standard precedence.
///
/// Precedence (highest to lowest):
/// 1. Command-line overrides
/// 2. Environment variables (`STAGEHAND_*`)
/// 3. Config file (explicit path, `./stagehand.toml`, or the user config dir)
/// 4. Built-in defaults
pub fn load_config(
	config_path: Option<&Path>,
	overrides: StagehandConfigLayer,
) -> Result<StagehandConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::discover(config_path.map(Path::to_path_buf))),
		Box::new(EnvSource::new()),
		Box::new(OverrideSource(overrides)),
	])
}

/// Merge the given sources in precedence order and resolve the result.
pub fn load_from_sources(
	mut sources: Vec<Box<dyn ConfigSource>>,
) -> Result<StagehandConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = StagehandConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

/// Finalize configuration layer into resolved config.
fn finalize(layer: StagehandConfigLayer) -> Result<StagehandConfig, ConfigError> {
	let config = StagehandConfig {
		platform: layer.platform.unwrap_or_default(),
		cluster: layer.cluster.unwrap_or_default().finalize(),
		kubernetes: layer.kubernetes.unwrap_or_default().finalize(),
		ops_manager: layer.ops_manager.unwrap_or_default().finalize(),
		replica_set: layer.replica_set.unwrap_or_default().finalize(),
		podman: layer.podman.unwrap_or_default().finalize(),
		timeouts: layer.timeouts.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		platform = %config.platform,
		cluster = %config.cluster.name,
		namespace = %config.kubernetes.namespace,
		operator_version = %config.kubernetes.operator_version,
		replica_set_members = config.replica_set.members,
		poll_interval_secs = config.timeouts.poll_interval_secs,
		log_dir = %config.logging.dir.display(),
		"Configuration loaded"
	);

	Ok(config)
}

fn require_non_empty(key: &str, value: &str) -> Result<(), ConfigError> {
	if value.trim().is_empty() {
		return Err(ConfigError::Validation(format!("{key} must not be empty")));
	}
	Ok(())
}

/// Validate cross-field configuration rules.
fn validate_config(config: &StagehandConfig) -> Result<(), ConfigError> {
	let timeouts = &config.timeouts;
	if timeouts.poll_interval_secs == 0 {
		return Err(ConfigError::Validation(
			"timeouts.poll_interval_secs must be greater than zero".to_string(),
		));
	}
	for (name, budget) in timeouts.readiness_budgets() {
		if budget <= timeouts.poll_interval_secs {
			return Err(ConfigError::Validation(format!(
				"timeouts.{name} ({budget}s) must exceed the poll interval ({}s)",
				timeouts.poll_interval_secs
			)));
		}
	}
	if timeouts.deletion_secs == 0 || timeouts.force_secs == 0 {
		return Err(ConfigError::Validation(
			"deletion and force timeouts must be greater than zero".to_string(),
		));
	}

	require_non_empty("cluster.name", &config.cluster.name)?;
	require_non_empty("kubernetes.namespace", &config.kubernetes.namespace)?;
	require_non_empty("ops_manager.name", &config.ops_manager.name)?;
	require_non_empty("replica_set.name", &config.replica_set.name)?;

	if config.replica_set.members == 0 {
		return Err(ConfigError::Validation(
			"replica_set.members must be at least 1".to_string(),
		));
	}
	let last_port = u64::from(config.replica_set.port) + u64::from(config.replica_set.members) - 1;
	if last_port > u64::from(u16::MAX) {
		return Err(ConfigError::Validation(format!(
			"replica_set.port {} with {} members runs past port {}",
			config.replica_set.port,
			config.replica_set.members,
			u16::MAX
		)));
	}
	if config.ops_manager.app_db_members == 0 {
		return Err(ConfigError::Validation(
			"ops_manager.app_db_members must be at least 1".to_string(),
		));
	}

	Ok(())
}
