// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Steps and their per-mode state machines.

use std::fmt;

use serde::Serialize;

use crate::resource::{ResourceId, ResourceSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
	Apply,
	Destroy,
}

impl StepMode {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Apply => "apply",
			Self::Destroy => "destroy",
		}
	}
}

impl fmt::Display for StepMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One unit of work: drive `spec` towards the state implied by `mode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
	pub spec: ResourceSpec,
	pub mode: StepMode,
}

impl Step {
	pub fn apply(spec: ResourceSpec) -> Self {
		Self {
			spec,
			mode: StepMode::Apply,
		}
	}

	pub fn destroy(spec: ResourceSpec) -> Self {
		Self {
			spec,
			mode: StepMode::Destroy,
		}
	}

	pub fn id(&self) -> ResourceId {
		self.spec.id()
	}
}

/// Builds the step list for `mode` from resources declared in creation order.
///
/// Destroy walks the declaration backwards so children are removed before the
/// controllers and clusters that own them.
pub fn plan_steps(resources: &[ResourceSpec], mode: StepMode) -> Vec<Step> {
	match mode {
		StepMode::Apply => resources.iter().cloned().map(Step::apply).collect(),
		StepMode::Destroy => resources.iter().rev().cloned().map(Step::destroy).collect(),
	}
}

/// Every state a step passes through in either mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
	Pending,
	// apply
	Creating,
	WaitingReady,
	Ready,
	TimedOut,
	Failed,
	// destroy
	Deleting,
	WaitingGone,
	Escalating,
	Forced,
	Gone,
	StillPresent,
	/// Never attempted because an earlier apply step aborted the run.
	Skipped,
}

impl StepState {
	pub fn can_transition_to(self, next: StepState) -> bool {
		use StepState::*;
		matches!(
			(self, next),
			(Pending, Creating)
				| (Pending, WaitingReady)
				| (Pending, Failed)
				| (Pending, Skipped)
				| (Creating, WaitingReady)
				| (Creating, Failed)
				| (WaitingReady, Ready)
				| (WaitingReady, TimedOut)
				| (Pending, Deleting)
				| (Pending, Gone)
				| (Deleting, WaitingGone)
				| (Deleting, Failed)
				| (WaitingGone, Gone)
				| (WaitingGone, Escalating)
				| (Escalating, Forced)
				| (Forced, Gone)
				| (Forced, StillPresent)
		)
	}

	pub fn is_terminal(self) -> bool {
		matches!(
			self,
			Self::Ready | Self::TimedOut | Self::Failed | Self::Gone | Self::StillPresent | Self::Skipped
		)
	}

	/// Outcome recorded for a terminal state.
	pub fn outcome(self) -> Option<StepOutcome> {
		match self {
			Self::Ready | Self::Gone => Some(StepOutcome::Success),
			Self::TimedOut => Some(StepOutcome::TimedOut),
			Self::Failed | Self::StillPresent => Some(StepOutcome::Failed),
			Self::Skipped => Some(StepOutcome::Skipped),
			_ => None,
		}
	}
}

impl fmt::Display for StepState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Pending => "pending",
			Self::Creating => "creating",
			Self::WaitingReady => "waiting_ready",
			Self::Ready => "ready",
			Self::TimedOut => "timed_out",
			Self::Failed => "failed",
			Self::Deleting => "deleting",
			Self::WaitingGone => "waiting_gone",
			Self::Escalating => "escalating",
			Self::Forced => "forced",
			Self::Gone => "gone",
			Self::StillPresent => "still_present",
			Self::Skipped => "skipped",
		};
		f.write_str(s)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
	Success,
	Failed,
	TimedOut,
	Skipped,
}

impl fmt::Display for StepOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Success => "success",
			Self::Failed => "failed",
			Self::TimedOut => "timed_out",
			Self::Skipped => "skipped",
		};
		f.write_str(s)
	}
}
