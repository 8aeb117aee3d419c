// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! End-to-end orchestrator runs against an in-memory backend.
//!
//! Tests cover:
//! - Repeated apply is idempotent
//! - Already-ready resources are left untouched
//! - Apply aborts on the first failing step
//! - Readiness timeouts carry diagnostics and exit code 2
//! - Destroy is best-effort and escalates stuck deletions
//! - Destroy gives up quickly when the backend cannot be reached
//! - Missing tools abort before any resource action

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stagehand_core::{
	AuditEvent, DriverError, DriverRegistry, DriverResult, MemoryAuditSink, Observation,
	OrchestratorConfig, ProvisionError, ProvisioningOrchestrator, ResourceDriver, ResourceId,
	ResourceKind, ResourceSpec, StepMode, StepOutcome, StepState, ToolCheck, EXIT_FAILURE,
	EXIT_NOT_READY, EXIT_PREREQUISITE_MISSING, EXIT_SUCCESS,
};

#[derive(Clone, Default)]
struct FakeResource {
	present: bool,
	/// Readiness answers in order; the last one repeats.
	ready_script: Vec<bool>,
	create_fails: bool,
	delete_fails: bool,
	/// Plain deletes have no effect.
	ignores_delete: bool,
	/// Forced deletes have no effect either.
	ignores_force: bool,
}

#[derive(Default)]
struct FakeBackend {
	resources: Mutex<HashMap<String, FakeResource>>,
	calls: Mutex<Vec<String>>,
}

impl FakeBackend {
	fn with(resources: &[(&str, FakeResource)]) -> Arc<Self> {
		let backend = Self::default();
		{
			let mut map = backend.resources.lock().unwrap();
			for (name, resource) in resources {
				map.insert(name.to_string(), resource.clone());
			}
		}
		Arc::new(backend)
	}

	fn record(&self, call: String) {
		self.calls.lock().unwrap().push(call);
	}

	fn calls(&self) -> Vec<String> {
		self.calls.lock().unwrap().clone()
	}

	fn calls_starting(&self, prefix: &str) -> Vec<String> {
		self
			.calls()
			.into_iter()
			.filter(|c| c.starts_with(prefix))
			.collect()
	}

	fn present(&self, name: &str) -> bool {
		self
			.resources
			.lock()
			.unwrap()
			.get(name)
			.is_some_and(|r| r.present)
	}
}

struct FakeDriver(Arc<FakeBackend>);

#[async_trait]
impl ResourceDriver for FakeDriver {
	fn name(&self) -> &'static str {
		"fake"
	}

	fn required_tools(&self) -> Vec<&str> {
		vec!["kubectl"]
	}

	async fn exists(&self, spec: &ResourceSpec) -> DriverResult<bool> {
		self.0.record(format!("exists:{}", spec.name));
		Ok(self.0.present(&spec.name))
	}

	async fn create(&self, spec: &ResourceSpec) -> DriverResult<()> {
		self.0.record(format!("create:{}", spec.name));
		let mut map = self.0.resources.lock().unwrap();
		let resource = map.entry(spec.name.clone()).or_default();
		if resource.create_fails {
			return Err(DriverError::CommandFailed {
				cmd: "kubectl".to_string(),
				args: vec!["apply".to_string()],
				stderr: "admission webhook denied the request".to_string(),
			});
		}
		resource.present = true;
		Ok(())
	}

	async fn is_ready(&self, spec: &ResourceSpec) -> DriverResult<Observation> {
		self.0.record(format!("probe:{}", spec.name));
		let mut map = self.0.resources.lock().unwrap();
		let resource = map.entry(spec.name.clone()).or_default();
		let ready = match resource.ready_script.len() {
			0 => true,
			1 => resource.ready_script[0],
			_ => resource.ready_script.remove(0),
		};
		Ok(if ready {
			Observation::ready("Ready")
		} else {
			Observation::pending("0/3 Ready")
		})
	}

	async fn delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		self.0.record(format!("delete:{}", spec.name));
		let mut map = self.0.resources.lock().unwrap();
		let resource = map.entry(spec.name.clone()).or_default();
		if resource.delete_fails {
			return Err(DriverError::CommandFailed {
				cmd: "kubectl".to_string(),
				args: vec!["delete".to_string()],
				stderr: "the server is currently unable to handle the request".to_string(),
			});
		}
		if !resource.ignores_delete {
			resource.present = false;
		}
		Ok(())
	}

	async fn force_delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		self.0.record(format!("force:{}", spec.name));
		let mut map = self.0.resources.lock().unwrap();
		let resource = map.entry(spec.name.clone()).or_default();
		if !resource.ignores_force {
			resource.present = false;
		}
		Ok(())
	}

	async fn diagnostics(&self, spec: &ResourceSpec) -> DriverResult<String> {
		Ok(format!("Name: {}\nStatus: Pending", spec.name))
	}
}

struct Tools(Vec<&'static str>);

#[async_trait]
impl ToolCheck for Tools {
	async fn is_available(&self, tool: &str) -> bool {
		self.0.iter().any(|t| *t == tool)
	}
}

fn present() -> FakeResource {
	FakeResource {
		present: true,
		..Default::default()
	}
}

fn stuck() -> FakeResource {
	FakeResource {
		present: true,
		delete_fails: true,
		ignores_delete: true,
		ignores_force: true,
		..Default::default()
	}
}

fn spec(name: &str) -> ResourceSpec {
	ResourceSpec::new(ResourceKind::Namespace, name)
		.with_timeouts(Duration::from_secs(60), Duration::from_secs(10))
}

fn id(name: &str) -> ResourceId {
	spec(name).id()
}

fn orchestrator(backend: &Arc<FakeBackend>, names: &[&str]) -> ProvisioningOrchestrator {
	let registry = DriverRegistry::new().with(
		ResourceKind::Namespace,
		Arc::new(FakeDriver(Arc::clone(backend))),
	);
	ProvisioningOrchestrator::new(registry, names.iter().map(|n| spec(n)).collect())
}

#[tokio::test(start_paused = true)]
async fn second_apply_performs_no_creates() {
	let backend = FakeBackend::with(&[]);
	let orchestrator = orchestrator(&backend, &["a", "b", "c"]);

	let first = orchestrator
		.run(StepMode::Apply, Box::new(MemoryAuditSink::new()))
		.await;
	assert_eq!(first.exit_code(), EXIT_SUCCESS);
	assert_eq!(first.creates, 3);

	let second = orchestrator
		.run(StepMode::Apply, Box::new(MemoryAuditSink::new()))
		.await;
	assert_eq!(second.exit_code(), EXIT_SUCCESS);
	assert_eq!(second.creates, 0);
	assert_eq!(second.count(StepOutcome::Success), 3);
	assert_eq!(backend.calls_starting("create:").len(), 3);
}

#[tokio::test(start_paused = true)]
async fn already_ready_resource_has_no_side_effects() {
	let backend = FakeBackend::with(&[("mongodb", present())]);
	let orchestrator = orchestrator(&backend, &["mongodb"]);

	let report = orchestrator
		.run(StepMode::Apply, Box::new(MemoryAuditSink::new()))
		.await;

	assert!(report.is_success());
	assert_eq!(report.creates, 0);
	assert_eq!(backend.calls(), vec!["exists:mongodb", "probe:mongodb"]);
	assert_eq!(report.records[0].elapsed, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn cluster_becomes_ready_on_third_check() {
	let backend = FakeBackend::with(&[(
		"demo",
		FakeResource {
			ready_script: vec![false, false, true],
			..Default::default()
		},
	)]);
	let registry = DriverRegistry::new().with(
		ResourceKind::Cluster,
		Arc::new(FakeDriver(Arc::clone(&backend))),
	);
	let cluster = ResourceSpec::new(ResourceKind::Cluster, "demo")
		.with_timeouts(Duration::from_secs(300), Duration::from_secs(10));
	let sink = MemoryAuditSink::new();

	let report = ProvisioningOrchestrator::new(registry, vec![cluster])
		.run(StepMode::Apply, Box::new(sink.clone()))
		.await;

	assert_eq!(report.exit_code(), EXIT_SUCCESS);
	assert_eq!(backend.calls_starting("create:").len(), 1);
	assert_eq!(backend.calls_starting("probe:").len(), 3);
	assert_eq!(report.records[0].state, StepState::Ready);
	assert_eq!(report.records[0].elapsed, Duration::from_secs(20));

	let observed: Vec<_> = sink
		.entries()
		.into_iter()
		.filter(|e| e.event == AuditEvent::StateObserved)
		.map(|e| e.message)
		.collect();
	assert_eq!(observed, vec!["0/3 Ready", "Ready"]);
}

#[tokio::test(start_paused = true)]
async fn apply_stops_at_first_failing_create() {
	let backend = FakeBackend::with(&[(
		"b",
		FakeResource {
			create_fails: true,
			..Default::default()
		},
	)]);
	let orchestrator = orchestrator(&backend, &["a", "b", "c", "d", "e"]);

	let report = orchestrator
		.run(StepMode::Apply, Box::new(MemoryAuditSink::new()))
		.await;

	assert_eq!(report.exit_code(), EXIT_FAILURE);
	assert!(matches!(
		report.fatal,
		Some(ProvisionError::FatalDriver { operation: "create", .. })
	));
	for untouched in ["c", "d", "e"] {
		assert!(backend.calls().iter().all(|c| !c.ends_with(&format!(":{untouched}"))));
		assert_eq!(report.outcome(&id(untouched)), Some(StepOutcome::Skipped));
	}
	assert_eq!(report.outcome(&id("a")), Some(StepOutcome::Success));
	assert_eq!(report.outcome(&id("b")), Some(StepOutcome::Failed));
}

#[tokio::test(start_paused = true)]
async fn readiness_timeout_exits_not_ready_with_diagnostics() {
	let backend = FakeBackend::with(&[(
		"ops-manager",
		FakeResource {
			present: true,
			ready_script: vec![false],
			..Default::default()
		},
	)]);
	let orchestrator = orchestrator(&backend, &["ops-manager", "replica-set"]);
	let sink = MemoryAuditSink::new();

	let report = orchestrator.run(StepMode::Apply, Box::new(sink.clone())).await;

	assert_eq!(report.exit_code(), EXIT_NOT_READY);
	match &report.fatal {
		Some(ProvisionError::ReadinessTimeout {
			elapsed, last_state, ..
		}) => {
			assert!(*elapsed >= Duration::from_secs(60));
			assert!(*elapsed <= Duration::from_secs(70));
			assert_eq!(last_state.as_deref(), Some("0/3 Ready"));
		}
		other => panic!("expected readiness timeout, got {other:?}"),
	}
	assert_eq!(report.outcome(&id("replica-set")), Some(StepOutcome::Skipped));

	let diagnostics = sink
		.entries()
		.into_iter()
		.find(|e| e.event == AuditEvent::Diagnostics)
		.expect("diagnostics logged");
	assert!(diagnostics.format_line().contains("    | Status: Pending"));
}

#[tokio::test(start_paused = true)]
async fn destroy_continues_past_stuck_resource() {
	let backend = FakeBackend::with(&[
		("a", present()),
		("b", present()),
		("c", stuck()),
		("d", present()),
		("e", present()),
	]);
	let orchestrator = orchestrator(&backend, &["a", "b", "c", "d", "e"]);

	let report = orchestrator
		.run(StepMode::Destroy, Box::new(MemoryAuditSink::new()))
		.await;

	assert_eq!(report.exit_code(), EXIT_SUCCESS);
	assert_eq!(
		backend.calls_starting("delete:"),
		vec!["delete:e", "delete:d", "delete:c", "delete:b", "delete:a"]
	);
	assert_eq!(backend.calls_starting("force:"), vec!["force:c"]);
	assert_eq!(report.failures.len(), 1);
	assert!(matches!(
		&report.failures[0],
		ProvisionError::DeletionStuck { id: stuck_id } if stuck_id.name == "c"
	));
	assert_eq!(report.outcome(&id("c")), Some(StepOutcome::Failed));
	assert_eq!(report.count(StepOutcome::Success), 4);
	assert!(backend.present("c"));
	assert!(!backend.present("a"));
}

#[tokio::test(start_paused = true)]
async fn destroy_escalates_when_delete_hangs() {
	let backend = FakeBackend::with(&[(
		"mongodb",
		FakeResource {
			present: true,
			ignores_delete: true,
			..Default::default()
		},
	)]);
	let orchestrator = orchestrator(&backend, &["mongodb"]).with_config(OrchestratorConfig {
		deletion_timeout: Duration::from_secs(40),
		force_timeout: Duration::from_secs(20),
	});

	let sink = MemoryAuditSink::new();

	let report = orchestrator.run(StepMode::Destroy, Box::new(sink.clone())).await;

	assert!(report.failures.is_empty());
	assert_eq!(report.records[0].state, StepState::Gone);
	assert_eq!(backend.calls_starting("force:"), vec!["force:mongodb"]);
	assert!(report.records[0].elapsed >= Duration::from_secs(40));

	let entries = sink.entries();
	let diagnostics = entries
		.iter()
		.position(|e| e.event == AuditEvent::Diagnostics && e.message == "deletion timed out")
		.expect("diagnostics logged at the deletion timeout");
	let escalating = entries
		.iter()
		.position(|e| e.event == AuditEvent::Transition && e.message.ends_with("-> escalating"))
		.expect("escalation logged");
	assert!(diagnostics < escalating);
}

struct Unreachable;

#[async_trait]
impl ResourceDriver for Unreachable {
	fn name(&self) -> &'static str {
		"unreachable"
	}

	async fn exists(&self, _spec: &ResourceSpec) -> DriverResult<bool> {
		Err(refused("get"))
	}

	async fn create(&self, _spec: &ResourceSpec) -> DriverResult<()> {
		Err(refused("apply"))
	}

	async fn is_ready(&self, _spec: &ResourceSpec) -> DriverResult<Observation> {
		Err(refused("get"))
	}

	async fn delete(&self, _spec: &ResourceSpec) -> DriverResult<()> {
		Err(refused("delete"))
	}

	async fn force_delete(&self, _spec: &ResourceSpec) -> DriverResult<()> {
		panic!("force_delete must not run when nothing answers");
	}

	async fn diagnostics(&self, _spec: &ResourceSpec) -> DriverResult<String> {
		Err(refused("describe"))
	}
}

fn refused(verb: &str) -> DriverError {
	DriverError::CommandFailed {
		cmd: "kubectl".to_string(),
		args: vec![verb.to_string()],
		stderr: "The connection to the server localhost:8080 was refused".to_string(),
	}
}

#[tokio::test(start_paused = true)]
async fn destroy_against_unreachable_backend_fails_fast() {
	let registry = DriverRegistry::new().with(ResourceKind::Namespace, Arc::new(Unreachable));
	let orchestrator = ProvisioningOrchestrator::new(
		registry,
		["a", "b", "c"].iter().map(|n| spec(n)).collect(),
	);
	let started = tokio::time::Instant::now();

	let report = orchestrator
		.run(StepMode::Destroy, Box::new(MemoryAuditSink::new()))
		.await;

	assert_eq!(report.exit_code(), EXIT_SUCCESS);
	assert!(started.elapsed() < Duration::from_secs(1));
	assert_eq!(report.failures.len(), 3);
	for failure in &report.failures {
		assert!(
			matches!(failure, ProvisionError::ExistenceUnknown { .. }),
			"expected unknown existence, got {failure:?}"
		);
	}
	assert_eq!(report.count(StepOutcome::Failed), 3);
	assert!(report
		.failures
		.iter()
		.all(|f| !matches!(f, ProvisionError::DeletionStuck { .. })));
}

#[tokio::test(start_paused = true)]
async fn destroy_waits_when_exists_fails_but_delete_is_accepted() {
	let backend = FakeBackend::with(&[("a", present())]);
	let flaky = Arc::new(FlakyExists {
		inner: FakeDriver(Arc::clone(&backend)),
		failures: Mutex::new(1),
	});
	let registry = DriverRegistry::new().with(ResourceKind::Namespace, flaky);

	let report = ProvisioningOrchestrator::new(registry, vec![spec("a")])
		.run(StepMode::Destroy, Box::new(MemoryAuditSink::new()))
		.await;

	assert!(report.failures.is_empty());
	assert_eq!(report.records[0].state, StepState::Gone);
	assert_eq!(backend.calls_starting("delete:"), vec!["delete:a"]);
	assert!(!backend.present("a"));
}

/// Fails the first `failures` existence checks, then defers to the fake.
struct FlakyExists {
	inner: FakeDriver,
	failures: Mutex<u32>,
}

#[async_trait]
impl ResourceDriver for FlakyExists {
	fn name(&self) -> &'static str {
		"flaky"
	}

	async fn exists(&self, spec: &ResourceSpec) -> DriverResult<bool> {
		{
			let mut failures = self.failures.lock().unwrap();
			if *failures > 0 {
				*failures -= 1;
				return Err(refused("get"));
			}
		}
		self.inner.exists(spec).await
	}

	async fn create(&self, spec: &ResourceSpec) -> DriverResult<()> {
		self.inner.create(spec).await
	}

	async fn is_ready(&self, spec: &ResourceSpec) -> DriverResult<Observation> {
		self.inner.is_ready(spec).await
	}

	async fn delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		self.inner.delete(spec).await
	}

	async fn force_delete(&self, spec: &ResourceSpec) -> DriverResult<()> {
		self.inner.force_delete(spec).await
	}

	async fn diagnostics(&self, spec: &ResourceSpec) -> DriverResult<String> {
		self.inner.diagnostics(spec).await
	}
}

#[tokio::test(start_paused = true)]
async fn destroy_skips_absent_resources() {
	let backend = FakeBackend::with(&[]);
	let orchestrator = orchestrator(&backend, &["a", "b"]);

	let report = orchestrator
		.run(StepMode::Destroy, Box::new(MemoryAuditSink::new()))
		.await;

	assert!(report.is_success());
	assert!(backend.calls_starting("delete:").is_empty());
	assert_eq!(report.count(StepOutcome::Success), 2);
}

#[tokio::test(start_paused = true)]
async fn missing_tool_touches_nothing() {
	let backend = FakeBackend::with(&[("a", present())]);
	let orchestrator = orchestrator(&backend, &["a"]).with_tool_check(Arc::new(Tools(vec!["kind"])));

	for mode in [StepMode::Apply, StepMode::Destroy] {
		let report = orchestrator.run(mode, Box::new(MemoryAuditSink::new())).await;
		assert_eq!(report.exit_code(), EXIT_PREREQUISITE_MISSING);
		match &report.fatal {
			Some(ProvisionError::PrerequisiteMissing { tools }) => assert_eq!(tools, &["kubectl"]),
			other => panic!("expected missing prerequisite, got {other:?}"),
		}
	}
	assert!(backend.calls().is_empty());
}
