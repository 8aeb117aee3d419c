// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Two-condition readiness for replicated workloads.

use crate::resource::Observation;

/// Replica and revision counters reported by a stateful or replicated workload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RolloutStatus {
	pub ready_replicas: u32,
	pub replicas: u32,
	pub current_revision: Option<String>,
	pub update_revision: Option<String>,
}

impl RolloutStatus {
	/// All replicas ready *and* the applied revision equals the target revision.
	///
	/// The replica count alone is not enough: mid-rollout a workload can report
	/// every replica ready while still running the previous revision.
	pub fn is_ready(&self) -> bool {
		self.replicas > 0
			&& self.ready_replicas == self.replicas
			&& self.current_revision.is_some()
			&& self.current_revision == self.update_revision
	}

	/// State string used for change-only logging, e.g. `2/3 Ready (rev abc)`.
	pub fn describe(&self) -> String {
		let rev = match (&self.current_revision, &self.update_revision) {
			(Some(current), Some(update)) if current == update => current.clone(),
			(Some(current), Some(update)) => format!("{current} -> {update}"),
			(Some(current), None) => current.clone(),
			(None, Some(update)) => format!("? -> {update}"),
			(None, None) => "?".to_string(),
		};
		format!("{}/{} Ready (rev {})", self.ready_replicas, self.replicas, rev)
	}

	pub fn observe(&self) -> Observation {
		Observation {
			ready: self.is_ready(),
			state: self.describe(),
		}
	}
}
