// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource plans for each platform, in creation order.

use std::time::Duration;

use stagehand_config::{Platform, StagehandConfig};
use stagehand_core::{ResourceKind, ResourceSpec};

/// Port the podman application database listens on, kept clear of the
/// replica set member ports.
const APP_DB_PORT: u16 = 27117;

const OPERATOR_DEPLOYMENT: &str = "mongodb-enterprise-operator";
const OPS_MANAGER_CRD: &str = "opsmanagers.mongodb.com";

pub fn build_plan(config: &StagehandConfig) -> Vec<ResourceSpec> {
	match config.platform {
		Platform::Kind => kind_plan(config),
		Platform::Podman => podman_plan(config),
	}
}

fn timed(spec: ResourceSpec, config: &StagehandConfig, budget_secs: u64) -> ResourceSpec {
	spec.with_timeouts(Duration::from_secs(budget_secs), config.timeouts.poll_interval())
}

fn admin_secret_name(config: &StagehandConfig) -> String {
	format!("{}-admin-secret", config.ops_manager.name)
}

fn project_config_map_name(config: &StagehandConfig) -> String {
	format!("{}-project", config.replica_set.name)
}

/// Cluster, operator, Ops Manager and a replica set on a local kind cluster.
pub fn kind_plan(config: &StagehandConfig) -> Vec<ResourceSpec> {
	let ns = config.kubernetes.namespace.as_str();
	let t = &config.timeouts;

	let mut cluster = ResourceSpec::new(ResourceKind::Cluster, &config.cluster.name)
		.with_config(kind_cluster_config());
	if let Some(image) = &config.cluster.node_image {
		cluster = cluster.with_param("image", image);
	}

	vec![
		timed(cluster, config, t.cluster_secs),
		timed(
			ResourceSpec::new(ResourceKind::Namespace, ns),
			config,
			t.namespace_secs,
		),
		timed(
			ResourceSpec::new(ResourceKind::CustomResource, OPS_MANAGER_CRD)
				.with_param("resource", "crd")
				.with_param("manifest_url", &config.kubernetes.crds_url)
				.with_param(
					"ready_jsonpath",
					"{.status.conditions[?(@.type==\"Established\")].status}",
				)
				.with_param("ready_value", "True"),
			config,
			t.crds_secs,
		),
		timed(
			ResourceSpec::new(ResourceKind::Service, OPERATOR_DEPLOYMENT)
				.in_namespace(ns)
				.with_param("resource", "deployment")
				.with_param("manifest_url", &config.kubernetes.operator_url),
			config,
			t.operator_secs,
		),
		timed(
			ResourceSpec::new(ResourceKind::CustomResource, admin_secret_name(config))
				.in_namespace(ns)
				.with_param("resource", "secret")
				.with_config(admin_secret_manifest(config)),
			config,
			t.namespace_secs,
		),
		timed(
			ResourceSpec::new(ResourceKind::CustomResource, &config.ops_manager.name)
				.in_namespace(ns)
				.with_param("resource", OPS_MANAGER_CRD)
				.with_param("ready_jsonpath", "{.status.opsManager.phase}")
				.with_param("ready_value", "Running")
				.with_config(ops_manager_manifest(config)),
			config,
			t.ops_manager_secs,
		),
		timed(
			ResourceSpec::new(ResourceKind::CustomResource, project_config_map_name(config))
				.in_namespace(ns)
				.with_param("resource", "configmap")
				.with_config(project_config_map_manifest(config)),
			config,
			t.namespace_secs,
		),
		timed(
			ResourceSpec::new(ResourceKind::CustomResource, &config.replica_set.name)
				.in_namespace(ns)
				.with_param("resource", "mongodb.mongodb.com")
				.with_param("ready_jsonpath", "{.status.phase}")
				.with_param("ready_value", "Running")
				.with_config(replica_set_manifest(config)),
			config,
			t.replica_set_secs,
		),
	]
}

fn kind_cluster_config() -> String {
	"kind: Cluster\n\
	 apiVersion: kind.x-k8s.io/v1alpha4\n\
	 nodes:\n\
	 - role: control-plane\n\
	 - role: worker\n"
		.to_string()
}

fn admin_secret_manifest(config: &StagehandConfig) -> String {
	let om = &config.ops_manager;
	format!(
		"apiVersion: v1
kind: Secret
metadata:
  name: {name}
  namespace: {ns}
type: Opaque
stringData:
  Username: {user}
  Password: {password}
  FirstName: Demo
  LastName: Admin
",
		name = admin_secret_name(config),
		ns = config.kubernetes.namespace,
		user = om.admin_user,
		password = om.admin_password,
	)
}

fn ops_manager_manifest(config: &StagehandConfig) -> String {
	let om = &config.ops_manager;
	format!(
		"apiVersion: mongodb.com/v1
kind: MongoDBOpsManager
metadata:
  name: {name}
  namespace: {ns}
spec:
  replicas: 1
  version: {version}
  adminCredentials: {secret}
  externalConnectivity:
    type: NodePort
  applicationDatabase:
    members: {members}
    version: {db_version}
",
		name = om.name,
		ns = config.kubernetes.namespace,
		version = om.version,
		secret = admin_secret_name(config),
		members = om.app_db_members,
		db_version = config.replica_set.version,
	)
}

fn project_config_map_manifest(config: &StagehandConfig) -> String {
	let ns = &config.kubernetes.namespace;
	let om = &config.ops_manager;
	format!(
		"apiVersion: v1
kind: ConfigMap
metadata:
  name: {name}
  namespace: {ns}
data:
  projectName: {project}
  orgId: \"\"
  baseUrl: http://{om_name}-svc.{ns}.svc.cluster.local:{port}
",
		name = project_config_map_name(config),
		project = config.replica_set.name,
		om_name = om.name,
		port = om.port,
	)
}

fn replica_set_manifest(config: &StagehandConfig) -> String {
	let ns = &config.kubernetes.namespace;
	let rs = &config.replica_set;
	format!(
		"apiVersion: mongodb.com/v1
kind: MongoDB
metadata:
  name: {name}
  namespace: {ns}
spec:
  type: ReplicaSet
  members: {members}
  version: {version}
  opsManager:
    configMapRef:
      name: {config_map}
  credentials: {ns}-{om_name}-admin-key
",
		name = rs.name,
		members = rs.members,
		version = rs.version,
		config_map = project_config_map_name(config),
		om_name = config.ops_manager.name,
	)
}

/// The same topology as plain podman containers on the host.
pub fn podman_plan(config: &StagehandConfig) -> Vec<ResourceSpec> {
	let t = &config.timeouts;
	let podman = &config.podman;
	let om = &config.ops_manager;
	let rs = &config.replica_set;
	let server_image = format!("{}:{}", podman.server_image, rs.version);
	let app_db_name = format!("{}-db", om.name);

	let mut plan = vec![
		timed(
			ResourceSpec::new(ResourceKind::Package, &podman.shell_package),
			config,
			t.package_secs,
		),
		timed(
			ResourceSpec::new(ResourceKind::Container, &app_db_name).with_config(container_args(
				&podman.network,
				&[],
				&server_image,
				&["--port".to_string(), APP_DB_PORT.to_string(), "--bind_ip_all".to_string()],
			)),
			config,
			t.container_secs,
		),
		timed(
			ResourceSpec::new(ResourceKind::Container, &om.name)
				.with_param("health_url", om.login_url("127.0.0.1"))
				.with_config(container_args(
					&podman.network,
					&[
						format!("OM_PROP_mms_mongoDbUri=mongodb://127.0.0.1:{APP_DB_PORT}"),
						format!("OM_PROP_mms_centralUrl=http://127.0.0.1:{}", om.port),
					],
					&format!("{}:{}", podman.ops_manager_image, om.version),
					&[],
				)),
			config,
			t.ops_manager_secs,
		),
	];

	for member in 0..rs.members {
		// Validation keeps every member port within range.
		let Some(port) = u16::try_from(member).ok().and_then(|m| rs.port.checked_add(m)) else {
			break;
		};
		plan.push(timed(
			ResourceSpec::new(ResourceKind::Container, format!("{}-{member}", rs.name))
				.with_config(container_args(
					&podman.network,
					&[],
					&server_image,
					&[
						"--replSet".to_string(),
						rs.name.clone(),
						"--port".to_string(),
						port.to_string(),
						"--bind_ip_all".to_string(),
					],
				)),
			config,
			t.replica_set_secs,
		));
	}

	plan
}

/// One `podman run` argument per line: network, environment, image, then the
/// image's own arguments.
fn container_args(network: &str, env: &[String], image: &str, command: &[String]) -> String {
	let mut lines = vec![format!("--network={network}")];
	lines.extend(env.iter().map(|e| format!("--env={e}")));
	lines.push(image.to_string());
	lines.extend(command.iter().cloned());
	lines.join("\n") + "\n"
}
