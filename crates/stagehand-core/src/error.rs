// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use thiserror::Error;

use crate::resource::{ResourceId, ResourceKind};

/// Result type alias for driver operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// Process exit code for a successful run.
pub const EXIT_SUCCESS: i32 = 0;
/// Process exit code for a generic fatal failure.
pub const EXIT_FAILURE: i32 = 1;
/// Process exit code when a resource never became ready.
pub const EXIT_NOT_READY: i32 = 2;
/// Process exit code when a required external tool is absent.
pub const EXIT_PREREQUISITE_MISSING: i32 = 3;

/// Errors raised by a single driver call against a concrete backend.
#[derive(Error, Debug)]
pub enum DriverError {
	#[error("required tool not found in PATH: {tool}")]
	ToolNotFound { tool: String },

	#[error("{cmd} {} failed: {stderr}", args.join(" "))]
	CommandFailed {
		cmd: String,
		args: Vec<String>,
		stderr: String,
	},

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),

	#[error("could not parse {what}: {message}")]
	Parse { what: String, message: String },

	#[error("HTTP probe failed: {0}")]
	Http(String),

	#[error("invalid resource spec: {0}")]
	InvalidSpec(String),
}

impl DriverError {
	pub fn parse(what: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Parse {
			what: what.into(),
			message: message.into(),
		}
	}

	pub fn invalid_spec(message: impl Into<String>) -> Self {
		Self::InvalidSpec(message.into())
	}
}

/// Errors that end (apply) or are collected by (destroy) an orchestrator run.
#[derive(Error, Debug)]
pub enum ProvisionError {
	#[error("missing prerequisites: {}", tools.join(", "))]
	PrerequisiteMissing { tools: Vec<String> },

	#[error("{id} not ready after {}s (last state: {})", elapsed.as_secs(), last_state.as_deref().unwrap_or("unknown"))]
	ReadinessTimeout {
		id: ResourceId,
		elapsed: Duration,
		last_state: Option<String>,
	},

	#[error("{id} still present after forced deletion")]
	DeletionStuck { id: ResourceId },

	#[error("could not tell whether {id} exists: {source}")]
	ExistenceUnknown {
		id: ResourceId,
		#[source]
		source: DriverError,
	},

	#[error("{operation} failed for {id}: {source}")]
	FatalDriver {
		id: ResourceId,
		operation: &'static str,
		#[source]
		source: DriverError,
	},

	#[error("duplicate step for {0}")]
	DuplicateStep(ResourceId),

	#[error("no driver registered for resource kind '{0}'")]
	NoDriver(ResourceKind),
}

impl ProvisionError {
	/// Maps the failure class onto the process exit code.
	pub fn exit_code(&self) -> i32 {
		match self {
			Self::PrerequisiteMissing { .. } => EXIT_PREREQUISITE_MISSING,
			Self::ReadinessTimeout { .. } => EXIT_NOT_READY,
			_ => EXIT_FAILURE,
		}
	}
}
