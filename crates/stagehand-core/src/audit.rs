// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Append-only, timestamped run log kept for post-mortems.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::resource::ResourceId;
use crate::step::StepMode;

#[derive(Error, Debug)]
pub enum AuditError {
	#[error("failed to open audit log {path}: {source}")]
	Open {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to write audit log: {0}")]
	Write(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
	RunStarted,
	StepStarted,
	Transition,
	StateObserved,
	ActionFailed,
	Diagnostics,
	StepFinished,
	RunFinished,
}

impl AuditEvent {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::RunStarted => "run_started",
			Self::StepStarted => "step_started",
			Self::Transition => "transition",
			Self::StateObserved => "state",
			Self::ActionFailed => "action_failed",
			Self::Diagnostics => "diagnostics",
			Self::StepFinished => "step_finished",
			Self::RunFinished => "run_finished",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
	pub timestamp: DateTime<Utc>,
	pub run_id: Uuid,
	pub mode: StepMode,
	pub resource: Option<ResourceId>,
	pub event: AuditEvent,
	pub message: String,
	/// Multi-line payload such as a diagnostic dump.
	pub detail: Option<String>,
}

impl AuditEntry {
	/// Renders the entry as one line, followed by indented detail lines.
	pub fn format_line(&self) -> String {
		let run = self.run_id.simple().to_string();
		let target = self
			.resource
			.as_ref()
			.map(ToString::to_string)
			.unwrap_or_else(|| "-".to_string());
		let mut line = format!(
			"{} {} [{}] {} {}: {}\n",
			self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
			&run[..8],
			self.mode,
			target,
			self.event.as_str(),
			self.message
		);
		if let Some(detail) = &self.detail {
			for detail_line in detail.lines() {
				line.push_str("    | ");
				line.push_str(detail_line);
				line.push('\n');
			}
		}
		line
	}
}

pub trait AuditSink: Send {
	fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError>;
}

/// Appends formatted entries to a file, flushing after every entry.
pub struct FileAuditSink {
	path: PathBuf,
	file: File,
}

impl FileAuditSink {
	pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
		let path = path.as_ref().to_path_buf();
		if let Some(parent) = path.parent() {
			if !parent.as_os_str().is_empty() {
				std::fs::create_dir_all(parent).map_err(|source| AuditError::Open {
					path: path.clone(),
					source,
				})?;
			}
		}
		let file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&path)
			.map_err(|source| AuditError::Open {
				path: path.clone(),
				source,
			})?;
		Ok(Self { path, file })
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl AuditSink for FileAuditSink {
	fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError> {
		self.file.write_all(entry.format_line().as_bytes())?;
		self.file.flush()?;
		Ok(())
	}
}

/// Keeps entries in memory; clones share the same buffer.
#[derive(Clone, Default)]
pub struct MemoryAuditSink {
	entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn entries(&self) -> Vec<AuditEntry> {
		self
			.entries
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.clone()
	}
}

impl AuditSink for MemoryAuditSink {
	fn append(&mut self, entry: &AuditEntry) -> Result<(), AuditError> {
		self
			.entries
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.push(entry.clone());
		Ok(())
	}
}

/// Discards everything. Used for dry runs.
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
	fn append(&mut self, _entry: &AuditEntry) -> Result<(), AuditError> {
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::resource::ResourceKind;
	use chrono::TimeZone;

	fn entry(detail: Option<&str>) -> AuditEntry {
		AuditEntry {
			timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap(),
			run_id: Uuid::parse_str("0123456789abcdef0123456789abcdef").unwrap(),
			mode: StepMode::Apply,
			resource: Some(ResourceId::new(ResourceKind::Cluster, None, "demo")),
			event: AuditEvent::StepFinished,
			message: "ready after 12s".to_string(),
			detail: detail.map(str::to_string),
		}
	}

	#[test]
	fn format_line_layout() {
		assert_eq!(
			entry(None).format_line(),
			"2025-03-01T12:30:00Z 01234567 [apply] cluster/demo step_finished: ready after 12s\n"
		);
	}

	#[test]
	fn detail_lines_are_indented() {
		let line = entry(Some("Name: demo\nStatus: Pending")).format_line();
		let lines: Vec<_> = line.lines().collect();
		assert_eq!(lines.len(), 3);
		assert_eq!(lines[1], "    | Name: demo");
		assert_eq!(lines[2], "    | Status: Pending");
	}

	#[test]
	fn file_sink_appends_across_reopen() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("logs/run.log");

		let mut sink = FileAuditSink::open(&path).unwrap();
		sink.append(&entry(None)).unwrap();
		drop(sink);

		let mut sink = FileAuditSink::open(&path).unwrap();
		sink.append(&entry(None)).unwrap();

		let contents = std::fs::read_to_string(&path).unwrap();
		assert_eq!(contents.lines().count(), 2);
	}

	#[test]
	fn memory_sink_clones_share_entries() {
		let sink = MemoryAuditSink::new();
		let mut writer = sink.clone();
		writer.append(&entry(None)).unwrap();
		assert_eq!(sink.entries().len(), 1);
	}
}
