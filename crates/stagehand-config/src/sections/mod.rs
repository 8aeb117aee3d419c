// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod cluster;
mod kubernetes;
mod logging;
mod mongodb;
mod platform;
mod podman;
mod timeouts;

pub use cluster::{ClusterConfig, ClusterConfigLayer, DEFAULT_CLUSTER_NAME, DEFAULT_CONTAINER_RUNTIME};
pub use kubernetes::{KubernetesConfig, KubernetesConfigLayer, DEFAULT_NAMESPACE, DEFAULT_OPERATOR_VERSION};
pub use logging::{run_log_path, LoggingConfig, LoggingConfigLayer};
pub use mongodb::{OpsManagerConfig, OpsManagerConfigLayer, ReplicaSetConfig, ReplicaSetConfigLayer};
pub use platform::Platform;
pub use podman::{PodmanConfig, PodmanConfigLayer};
pub use timeouts::{TimeoutsConfig, TimeoutsConfigLayer};
