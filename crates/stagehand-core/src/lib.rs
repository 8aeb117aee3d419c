// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Readiness-driven, idempotent provisioning engine.
//!
//! A run walks an ordered list of [`ResourceSpec`]s. Apply converges each one
//! to "exists and ready" before moving on; destroy removes them in reverse with
//! forced escalation. The engine only talks to backends through
//! [`ResourceDriver`], and keeps no state between runs.

pub mod audit;
pub mod driver;
pub mod error;
pub mod orchestrator;
pub mod poller;
pub mod readiness;
pub mod resource;
pub mod rollout;
pub mod run;
pub mod step;

pub use audit::{
	AuditEntry, AuditError, AuditEvent, AuditSink, FileAuditSink, MemoryAuditSink, NullAuditSink,
};
pub use driver::{DriverRegistry, ResourceDriver, ToolCheck};
pub use error::{
	DriverError, DriverResult, ProvisionError, EXIT_FAILURE, EXIT_NOT_READY,
	EXIT_PREREQUISITE_MISSING, EXIT_SUCCESS,
};
pub use orchestrator::{
	OrchestratorConfig, ProvisioningOrchestrator, DEFAULT_DELETION_TIMEOUT, DEFAULT_FORCE_TIMEOUT,
};
pub use poller::RetryPoller;
pub use readiness::{ReadinessResult, ReadinessWaiter};
pub use resource::{
	Observation, ResourceId, ResourceKind, ResourceSpec, DEFAULT_POLL_INTERVAL,
	DEFAULT_READINESS_TIMEOUT,
};
pub use rollout::RolloutStatus;
pub use run::{RunReport, RunState, StepRecord};
pub use step::{plan_steps, Step, StepMode, StepOutcome, StepState};
