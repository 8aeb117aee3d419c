// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource drivers that shell out to `kind`, `kubectl`, `podman`, `yum` and
//! `rpm`.
//!
//! Every driver goes through a [`CommandRunner`], so tests substitute a
//! scripted runner for the real binaries.

pub mod command;
pub mod container;
pub mod http;
pub mod kind;
pub mod kubectl;
pub mod manifest;
pub mod namespace;
pub mod package;
pub mod prereq;
pub mod rollout;

use std::sync::Arc;

use stagehand_core::{DriverRegistry, ResourceKind};

pub use command::{CommandOutput, CommandRunner, TokioCommandRunner};
pub use container::ContainerDriver;
pub use http::{HttpProbe, DEFAULT_PROBE_TIMEOUT};
pub use kind::KindClusterDriver;
pub use kubectl::Kubectl;
pub use manifest::ManifestDriver;
pub use namespace::NamespaceDriver;
pub use package::PackageDriver;
pub use prereq::CommandToolCheck;
pub use rollout::RolloutDriver;

/// Registers one driver per [`ResourceKind`].
///
/// `container_runtime` is the CLI kind uses for its node containers; forced
/// cluster deletion removes them with it.
pub fn default_registry(
	runner: Arc<dyn CommandRunner>,
	probe: HttpProbe,
	container_runtime: &str,
) -> DriverRegistry {
	DriverRegistry::new()
		.with(
			ResourceKind::Cluster,
			Arc::new(KindClusterDriver::new(runner.clone(), container_runtime)),
		)
		.with(
			ResourceKind::Namespace,
			Arc::new(NamespaceDriver::new(runner.clone())),
		)
		.with(
			ResourceKind::CustomResource,
			Arc::new(ManifestDriver::new(runner.clone())),
		)
		.with(
			ResourceKind::Service,
			Arc::new(RolloutDriver::new(runner.clone(), probe.clone())),
		)
		.with(
			ResourceKind::Container,
			Arc::new(ContainerDriver::new(runner.clone(), probe)),
		)
		.with(ResourceKind::Package, Arc::new(PackageDriver::new(runner)))
}
