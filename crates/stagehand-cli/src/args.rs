// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use clap::Parser;
use stagehand_config::{
	ClusterConfigLayer, KubernetesConfigLayer, LoggingConfigLayer, Platform, StagehandConfigLayer,
	TimeoutsConfigLayer,
};
use stagehand_core::StepMode;

/// Stand up, or tear down, a MongoDB Ops Manager demo environment.
#[derive(Parser, Debug)]
#[command(name = "stagehand", version, about, long_about = None)]
pub struct Args {
	/// Tear the environment down instead of creating it
	#[arg(long)]
	pub cleanup: bool,

	/// Path to the TOML config file
	#[arg(short, long, env = "STAGEHAND_CONFIG")]
	pub config: Option<PathBuf>,

	/// Target platform: kind or podman
	#[arg(long)]
	pub platform: Option<Platform>,

	/// Directory for the per-run log file
	#[arg(long)]
	pub log_dir: Option<PathBuf>,

	/// kind cluster name
	#[arg(long)]
	pub cluster_name: Option<String>,

	/// Kubernetes namespace for the operator and MongoDB resources
	#[arg(long)]
	pub namespace: Option<String>,

	/// Seconds between readiness polls
	#[arg(long)]
	pub poll_interval: Option<u64>,

	/// Print the ordered steps and exit without touching anything
	#[arg(long)]
	pub dry_run: bool,
}

impl Args {
	pub fn mode(&self) -> StepMode {
		if self.cleanup {
			StepMode::Destroy
		} else {
			StepMode::Apply
		}
	}

	/// Command-line values as the highest-precedence config layer.
	pub fn overrides(&self) -> StagehandConfigLayer {
		let mut layer = StagehandConfigLayer {
			platform: self.platform,
			..Default::default()
		};
		if self.cluster_name.is_some() {
			layer.cluster = Some(ClusterConfigLayer {
				name: self.cluster_name.clone(),
				..Default::default()
			});
		}
		if self.namespace.is_some() {
			layer.kubernetes = Some(KubernetesConfigLayer {
				namespace: self.namespace.clone(),
				..Default::default()
			});
		}
		if self.poll_interval.is_some() {
			layer.timeouts = Some(TimeoutsConfigLayer {
				poll_interval_secs: self.poll_interval,
				..Default::default()
			});
		}
		if self.log_dir.is_some() {
			layer.logging = Some(LoggingConfigLayer {
				dir: self.log_dir.clone(),
				..Default::default()
			});
		}
		layer
	}
}
