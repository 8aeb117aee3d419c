// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sequential apply/destroy over a declared resource list.
//!
//! Apply is fail-fast: the first create error or readiness timeout aborts the
//! run and every later step is recorded as skipped. Destroy is best-effort: a
//! stuck resource is escalated, logged and left behind while the remaining
//! steps still run, and the run itself never fails on a teardown error.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::audit::{AuditEvent, AuditSink};
use crate::driver::{DriverRegistry, ResourceDriver, ToolCheck};
use crate::error::ProvisionError;
use crate::poller::RetryPoller;
use crate::readiness::ReadinessWaiter;
use crate::resource::{ResourceId, ResourceSpec};
use crate::run::{RunReport, RunState, StepRecord};
use crate::step::{plan_steps, Step, StepMode, StepOutcome, StepState};

/// Deletion budget before escalating to a forced delete.
pub const DEFAULT_DELETION_TIMEOUT: Duration = Duration::from_secs(150);
/// Budget for the re-poll after a forced delete.
pub const DEFAULT_FORCE_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
	pub deletion_timeout: Duration,
	pub force_timeout: Duration,
}

impl Default for OrchestratorConfig {
	fn default() -> Self {
		Self {
			deletion_timeout: DEFAULT_DELETION_TIMEOUT,
			force_timeout: DEFAULT_FORCE_TIMEOUT,
		}
	}
}

/// Tracks one step through its state machine and writes every transition to
/// the run log.
struct StepProgress<'a> {
	id: &'a ResourceId,
	mode: StepMode,
	state: StepState,
	started: Instant,
}

impl<'a> StepProgress<'a> {
	fn new(id: &'a ResourceId, mode: StepMode) -> Self {
		Self {
			id,
			mode,
			state: StepState::Pending,
			started: Instant::now(),
		}
	}

	fn transition(&mut self, run: &mut RunState, next: StepState) {
		debug_assert!(
			self.state.can_transition_to(next),
			"illegal step transition {} -> {}",
			self.state,
			next
		);
		debug!(resource = %self.id, from = %self.state, to = %next, "step transition");
		run.log(
			Some(self.id),
			AuditEvent::Transition,
			format!("{} -> {}", self.state, next),
		);
		self.state = next;
	}

	fn finish(self, run: &mut RunState, message: impl Into<String>) {
		let outcome = self.state.outcome().unwrap_or(StepOutcome::Failed);
		let elapsed = self.started.elapsed();
		run.log(
			Some(self.id),
			AuditEvent::StepFinished,
			format!("{outcome} ({}) after {}s: {}", self.state, elapsed.as_secs(), message.into()),
		);
		run.record(StepRecord {
			id: self.id.clone(),
			mode: self.mode,
			state: self.state,
			outcome,
			elapsed,
		});
	}
}

/// Runs a declared list of resources through apply or destroy.
pub struct ProvisioningOrchestrator {
	registry: DriverRegistry,
	resources: Vec<ResourceSpec>,
	tool_check: Option<Arc<dyn ToolCheck>>,
	waiter: ReadinessWaiter,
	config: OrchestratorConfig,
}

impl ProvisioningOrchestrator {
	/// `resources` are listed in creation order; destroy runs them reversed.
	pub fn new(registry: DriverRegistry, resources: Vec<ResourceSpec>) -> Self {
		Self {
			registry,
			resources,
			tool_check: None,
			waiter: ReadinessWaiter::new(),
			config: OrchestratorConfig::default(),
		}
	}

	pub fn with_tool_check(mut self, check: Arc<dyn ToolCheck>) -> Self {
		self.tool_check = Some(check);
		self
	}

	pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
		self.config = config;
		self
	}

	pub fn steps(&self, mode: StepMode) -> Vec<Step> {
		plan_steps(&self.resources, mode)
	}

	/// Executes every step for `mode`, logging to `sink`.
	#[instrument(skip_all, fields(mode = %mode))]
	pub async fn run(&self, mode: StepMode, sink: Box<dyn AuditSink>) -> RunReport {
		let mut run = RunState::new(mode, sink);
		let steps = self.steps(mode);

		info!(run_id = %run.run_id(), steps = steps.len(), "starting run");
		run.log(
			None,
			AuditEvent::RunStarted,
			format!("{} steps", steps.len()),
		);

		if let Err(e) = self.preflight(&steps).await {
			error!(error = %e, "preflight failed, no resources touched");
			for step in &steps {
				skip(&mut run, step);
			}
			run.log(None, AuditEvent::RunFinished, format!("aborted: {e}"));
			return run.into_report(Vec::new(), Some(e));
		}

		let mut failures = Vec::new();
		let mut fatal: Option<ProvisionError> = None;

		for (index, step) in steps.iter().enumerate() {
			run.set_current_step(index);

			if fatal.is_some() {
				skip(&mut run, step);
				continue;
			}

			let Some(driver) = self.registry.get(step.spec.kind) else {
				// Preflight rejects plans with unserved kinds.
				fatal = Some(ProvisionError::NoDriver(step.spec.kind));
				skip(&mut run, step);
				continue;
			};

			match step.mode {
				StepMode::Apply => {
					if let Err(e) = self.apply_step(step, driver.as_ref(), &mut run).await {
						error!(step = index, error = %e, "apply aborted");
						fatal = Some(e);
					}
				}
				StepMode::Destroy => {
					if let Some(e) = self.destroy_step(step, driver.as_ref(), &mut run).await {
						warn!(step = index, error = %e, "teardown incomplete, continuing");
						failures.push(e);
					}
				}
			}
		}

		let summary = match &fatal {
			Some(e) => format!("failed: {e}"),
			None if failures.is_empty() => "completed".to_string(),
			None => format!("completed with {} unresolved resource(s)", failures.len()),
		};
		info!(run_id = %run.run_id(), summary = %summary, "run finished");
		run.log(None, AuditEvent::RunFinished, summary);

		run.into_report(failures, fatal)
	}

	/// Rejects duplicate identities, unserved kinds and missing tools before any
	/// resource action.
	async fn preflight(&self, steps: &[Step]) -> Result<(), ProvisionError> {
		let mut seen = HashSet::new();
		let mut tools = BTreeSet::new();

		for step in steps {
			let id = step.id();
			let driver = self
				.registry
				.get(step.spec.kind)
				.ok_or(ProvisionError::NoDriver(step.spec.kind))?;
			tools.extend(driver.required_tools());
			if !seen.insert(id.clone()) {
				return Err(ProvisionError::DuplicateStep(id));
			}
		}

		let Some(check) = &self.tool_check else {
			return Ok(());
		};

		let mut missing = Vec::new();
		for tool in tools {
			if !check.is_available(tool).await {
				missing.push(tool.to_string());
			}
		}

		if missing.is_empty() {
			Ok(())
		} else {
			Err(ProvisionError::PrerequisiteMissing { tools: missing })
		}
	}

	async fn apply_step(
		&self,
		step: &Step,
		driver: &dyn ResourceDriver,
		run: &mut RunState,
	) -> Result<(), ProvisionError> {
		let spec = &step.spec;
		let id = step.id();
		let mut progress = StepProgress::new(&id, StepMode::Apply);

		info!(resource = %id, driver = driver.name(), "applying");
		run.log(Some(&id), AuditEvent::StepStarted, format!("apply via {}", driver.name()));

		// Preflight guarantees one step per identity, so readiness is never
		// known before this point; `mark_ready` below keeps the record monotone.
		let exists = match driver.exists(spec).await {
			Ok(exists) => exists,
			Err(source) => {
				run.log(Some(&id), AuditEvent::ActionFailed, format!("exists check failed: {source}"));
				progress.transition(run, StepState::Failed);
				progress.finish(run, "could not determine whether the resource exists");
				return Err(ProvisionError::FatalDriver {
					id: id.clone(),
					operation: "exists",
					source,
				});
			}
		};

		if exists {
			debug!(resource = %id, "already exists, skipping create");
		} else {
			if !run.begin_create(&id) {
				progress.transition(run, StepState::Failed);
				progress.finish(run, "create already attempted in this run");
				return Err(ProvisionError::DuplicateStep(id.clone()));
			}
			progress.transition(run, StepState::Creating);
			if let Err(source) = driver.create(spec).await {
				run.log(Some(&id), AuditEvent::ActionFailed, format!("create failed: {source}"));
				progress.transition(run, StepState::Failed);
				progress.finish(run, "create failed");
				return Err(ProvisionError::FatalDriver {
					id: id.clone(),
					operation: "create",
					source,
				});
			}
		}

		progress.transition(run, StepState::WaitingReady);
		let result = {
			let id = &id;
			let run = &mut *run;
			self
				.waiter
				.wait_ready(spec, driver, |state| {
					info!(resource = %id, state, "readiness changed");
					run.log(Some(id), AuditEvent::StateObserved, state);
				})
				.await
		};

		if result.ready {
			progress.transition(run, StepState::Ready);
			run.mark_ready(&id);
			progress.finish(run, format!("ready after {} probe(s)", result.attempts));
			return Ok(());
		}

		if let Some(dump) = &result.diagnostics {
			run.log_detail(Some(&id), AuditEvent::Diagnostics, "state at timeout", dump.as_str());
		}
		progress.transition(run, StepState::TimedOut);
		progress.finish(run, "readiness not reached");
		Err(ProvisionError::ReadinessTimeout {
			id: id.clone(),
			elapsed: result.elapsed,
			last_state: result.last_observed_state,
		})
	}

	/// Returns the failure to collect, if the resource could not be removed.
	async fn destroy_step(
		&self,
		step: &Step,
		driver: &dyn ResourceDriver,
		run: &mut RunState,
	) -> Option<ProvisionError> {
		let spec = &step.spec;
		let id = step.id();
		let mut progress = StepProgress::new(&id, StepMode::Destroy);

		info!(resource = %id, driver = driver.name(), "destroying");
		run.log(Some(&id), AuditEvent::StepStarted, format!("destroy via {}", driver.name()));

		let (present, exists_error) = match driver.exists(spec).await {
			Ok(present) => (present, None),
			Err(e) => {
				warn!(resource = %id, error = %e, "exists check failed, attempting delete anyway");
				run.log(Some(&id), AuditEvent::ActionFailed, format!("exists check failed: {e}"));
				(true, Some(e))
			}
		};

		if !present {
			progress.transition(run, StepState::Gone);
			progress.finish(run, "already absent");
			return None;
		}

		progress.transition(run, StepState::Deleting);
		if let Err(e) = driver.delete(spec).await {
			warn!(resource = %id, error = %e, "delete request failed");
			run.log(Some(&id), AuditEvent::ActionFailed, format!("delete failed: {e}"));
			if let Some(source) = exists_error {
				// Neither exists nor delete answered.
				progress.transition(run, StepState::Failed);
				progress.finish(run, "existence unknown, backend unreachable");
				return Some(ProvisionError::ExistenceUnknown {
					id: id.clone(),
					source,
				});
			}
		}

		progress.transition(run, StepState::WaitingGone);
		let deletion_timeout = spec.deletion_timeout.unwrap_or(self.config.deletion_timeout);
		if wait_gone(spec, driver, deletion_timeout).await {
			progress.transition(run, StepState::Gone);
			progress.finish(run, "deleted");
			return None;
		}

		warn!(
			resource = %id,
			timeout_secs = deletion_timeout.as_secs(),
			"timeout waiting for deletion, forcing"
		);
		log_diagnostics(run, driver, spec, &id, "deletion timed out").await;
		progress.transition(run, StepState::Escalating);
		if let Err(e) = driver.force_delete(spec).await {
			warn!(resource = %id, error = %e, "forced delete failed");
			run.log(Some(&id), AuditEvent::ActionFailed, format!("force delete failed: {e}"));
		}
		progress.transition(run, StepState::Forced);

		if wait_gone(spec, driver, self.config.force_timeout).await {
			progress.transition(run, StepState::Gone);
			progress.finish(run, "deleted after forced escalation");
			return None;
		}

		log_diagnostics(run, driver, spec, &id, "still present").await;
		progress.transition(run, StepState::StillPresent);
		progress.finish(run, "resource resisted forced deletion");
		Some(ProvisionError::DeletionStuck { id: id.clone() })
	}
}

fn skip(run: &mut RunState, step: &Step) {
	let id = step.id();
	let mut progress = StepProgress::new(&id, step.mode);
	progress.transition(run, StepState::Skipped);
	progress.finish(run, "not attempted");
}

async fn log_diagnostics(
	run: &mut RunState,
	driver: &dyn ResourceDriver,
	spec: &ResourceSpec,
	id: &ResourceId,
	title: &str,
) {
	match driver.diagnostics(spec).await {
		Ok(dump) => run.log_detail(Some(id), AuditEvent::Diagnostics, title, dump),
		Err(e) => run.log(
			Some(id),
			AuditEvent::ActionFailed,
			format!("diagnostics unavailable: {e}"),
		),
	}
}

/// Polls `exists` until it reports the resource absent. Errors count as
/// "still present".
async fn wait_gone(spec: &ResourceSpec, driver: &dyn ResourceDriver, timeout: Duration) -> bool {
	RetryPoller::new(timeout, spec.poll_interval)
		.poll(move || async move { driver.exists(spec).await.map(|exists| !exists) })
		.await
}
