// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Logging configuration section.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfigLayer {
	pub level: Option<String>,
	pub dir: Option<PathBuf>,
}

impl LoggingConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.level.is_some() {
			self.level = other.level;
		}
		if other.dir.is_some() {
			self.dir = other.dir;
		}
	}

	pub fn finalize(self) -> LoggingConfig {
		LoggingConfig {
			level: self.level.unwrap_or_else(|| "info".to_string()),
			dir: self.dir.unwrap_or_else(|| PathBuf::from("./logs")),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
	/// Default `tracing` filter; `RUST_LOG` takes precedence.
	pub level: String,
	/// Directory for per-run audit logs.
	pub dir: PathBuf,
}

impl LoggingConfig {
	/// `<dir>/stagehand-<timestamp>-<mode>.log`
	pub fn run_log_path(&self, timestamp: &str, mode: &str) -> PathBuf {
		run_log_path(&self.dir, timestamp, mode)
	}
}

pub fn run_log_path(dir: &Path, timestamp: &str, mode: &str) -> PathBuf {
	dir.join(format!("stagehand-{timestamp}-{mode}.log"))
}

impl Default for LoggingConfig {
	fn default() -> Self {
		LoggingConfigLayer::default().finalize()
	}
}
