// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Per-invocation run state and the report handed back to the caller.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditEvent, AuditSink};
use crate::error::{ProvisionError, EXIT_SUCCESS};
use crate::resource::ResourceId;
use crate::step::{StepMode, StepOutcome, StepState};

/// Terminal record for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
	pub id: ResourceId,
	pub mode: StepMode,
	pub state: StepState,
	pub outcome: StepOutcome,
	pub elapsed: Duration,
}

/// State owned by the orchestrator for exactly one invocation.
///
/// Nothing here outlives the process: the external resources are the only
/// durable truth and are queried fresh on every run.
pub struct RunState {
	run_id: Uuid,
	mode: StepMode,
	sink: Box<dyn AuditSink>,
	current_step: usize,
	records: Vec<StepRecord>,
	created: HashSet<ResourceId>,
	ready: HashSet<ResourceId>,
	sink_failed: bool,
}

impl RunState {
	pub fn new(mode: StepMode, sink: Box<dyn AuditSink>) -> Self {
		Self {
			run_id: Uuid::new_v4(),
			mode,
			sink,
			current_step: 0,
			records: Vec::new(),
			created: HashSet::new(),
			ready: HashSet::new(),
			sink_failed: false,
		}
	}

	pub fn run_id(&self) -> Uuid {
		self.run_id
	}

	pub fn mode(&self) -> StepMode {
		self.mode
	}

	pub fn current_step(&self) -> usize {
		self.current_step
	}

	pub(crate) fn set_current_step(&mut self, index: usize) {
		self.current_step = index;
	}

	pub fn log(&mut self, resource: Option<&ResourceId>, event: AuditEvent, message: impl Into<String>) {
		self.append(resource, event, message.into(), None);
	}

	pub fn log_detail(
		&mut self,
		resource: Option<&ResourceId>,
		event: AuditEvent,
		message: impl Into<String>,
		detail: impl Into<String>,
	) {
		self.append(resource, event, message.into(), Some(detail.into()));
	}

	fn append(
		&mut self,
		resource: Option<&ResourceId>,
		event: AuditEvent,
		message: String,
		detail: Option<String>,
	) {
		let entry = AuditEntry {
			timestamp: Utc::now(),
			run_id: self.run_id,
			mode: self.mode,
			resource: resource.cloned(),
			event,
			message,
			detail,
		};
		if let Err(e) = self.sink.append(&entry) {
			// Report once; a broken log must not stop provisioning.
			if !self.sink_failed {
				warn!(error = %e, "audit log write failed");
				self.sink_failed = true;
			}
		}
	}

	pub(crate) fn record(&mut self, record: StepRecord) {
		self.records.push(record);
	}

	pub fn records(&self) -> &[StepRecord] {
		&self.records
	}

	pub fn outcome(&self, id: &ResourceId) -> Option<StepOutcome> {
		self
			.records
			.iter()
			.rev()
			.find(|r| &r.id == id)
			.map(|r| r.outcome)
	}

	/// Registers a create attempt. Returns `false` if one was already made for
	/// this identity in the current run.
	pub(crate) fn begin_create(&mut self, id: &ResourceId) -> bool {
		self.created.insert(id.clone())
	}

	pub fn created(&self) -> usize {
		self.created.len()
	}

	pub(crate) fn mark_ready(&mut self, id: &ResourceId) {
		self.ready.insert(id.clone());
	}

	pub fn is_known_ready(&self, id: &ResourceId) -> bool {
		self.ready.contains(id)
	}

	pub(crate) fn into_report(self, failures: Vec<ProvisionError>, fatal: Option<ProvisionError>) -> RunReport {
		RunReport {
			run_id: self.run_id,
			mode: self.mode,
			records: self.records,
			creates: self.created.len(),
			failures,
			fatal,
		}
	}
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct RunReport {
	pub run_id: Uuid,
	pub mode: StepMode,
	pub records: Vec<StepRecord>,
	/// Number of create calls issued.
	pub creates: usize,
	/// Non-fatal failures collected during a best-effort teardown.
	pub failures: Vec<ProvisionError>,
	/// The error that aborted the run, if any.
	pub fatal: Option<ProvisionError>,
}

impl RunReport {
	pub fn is_success(&self) -> bool {
		self.fatal.is_none()
	}

	pub fn exit_code(&self) -> i32 {
		self.fatal.as_ref().map_or(EXIT_SUCCESS, ProvisionError::exit_code)
	}

	pub fn count(&self, outcome: StepOutcome) -> usize {
		self.records.iter().filter(|r| r.outcome == outcome).count()
	}

	pub fn outcome(&self, id: &ResourceId) -> Option<StepOutcome> {
		self.records.iter().find(|r| &r.id == id).map(|r| r.outcome)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::audit::{AuditError, MemoryAuditSink};
	use crate::resource::ResourceKind;

	struct BrokenSink;

	impl AuditSink for BrokenSink {
		fn append(&mut self, _entry: &AuditEntry) -> Result<(), AuditError> {
			Err(AuditError::Write(std::io::Error::other("disk full")))
		}
	}

	fn id(name: &str) -> ResourceId {
		ResourceId::new(ResourceKind::Namespace, None, name)
	}

	#[test]
	fn create_is_registered_once_per_identity() {
		let mut run = RunState::new(StepMode::Apply, Box::new(MemoryAuditSink::new()));
		assert!(run.begin_create(&id("mongodb")));
		assert!(!run.begin_create(&id("mongodb")));
		assert!(run.begin_create(&id("other")));
		assert_eq!(run.created(), 2);
	}

	#[test]
	fn readiness_record_is_monotone() {
		let mut run = RunState::new(StepMode::Apply, Box::new(MemoryAuditSink::new()));
		assert!(!run.is_known_ready(&id("mongodb")));
		run.mark_ready(&id("mongodb"));
		run.mark_ready(&id("mongodb"));
		assert!(run.is_known_ready(&id("mongodb")));
		assert!(!run.is_known_ready(&id("other")));
	}

	#[test]
	fn log_entries_carry_run_id_and_mode() {
		let sink = MemoryAuditSink::new();
		let mut run = RunState::new(StepMode::Destroy, Box::new(sink.clone()));
		run.log(Some(&id("mongodb")), AuditEvent::StepStarted, "deleting");

		let entries = sink.entries();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].run_id, run.run_id());
		assert_eq!(entries[0].mode, StepMode::Destroy);
		assert_eq!(entries[0].message, "deleting");
	}

	#[test]
	fn broken_sink_does_not_panic() {
		let mut run = RunState::new(StepMode::Apply, Box::new(BrokenSink));
		run.log(None, AuditEvent::RunStarted, "one");
		run.log(None, AuditEvent::RunStarted, "two");
		assert!(run.sink_failed);
	}

	#[test]
	fn report_exit_code_follows_fatal_error() {
		let run = RunState::new(StepMode::Apply, Box::new(MemoryAuditSink::new()));
		let report = run.into_report(
			Vec::new(),
			Some(ProvisionError::PrerequisiteMissing {
				tools: vec!["kind".to_string()],
			}),
		);
		assert!(!report.is_success());
		assert_eq!(report.exit_code(), crate::error::EXIT_PREREQUISITE_MISSING);
	}
}
