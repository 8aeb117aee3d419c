// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Running external CLIs.

use std::process::Stdio;

use async_trait::async_trait;
use stagehand_core::{DriverError, DriverResult};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{trace, warn};

/// Captured result of a finished command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOutput {
	/// Exit code, `None` if the process was killed by a signal.
	pub status: Option<i32>,
	pub stdout: String,
	pub stderr: String,
}

impl CommandOutput {
	pub fn ok(stdout: impl Into<String>) -> Self {
		Self {
			status: Some(0),
			stdout: stdout.into(),
			stderr: String::new(),
		}
	}

	pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
		Self {
			status: Some(code),
			stdout: String::new(),
			stderr: stderr.into(),
		}
	}

	pub fn success(&self) -> bool {
		self.status == Some(0)
	}

	/// Converts a non-zero exit into [`DriverError::CommandFailed`] and returns
	/// trimmed stdout otherwise.
	pub fn into_stdout(self, program: &str, args: &[&str]) -> DriverResult<String> {
		if self.success() {
			Ok(self.stdout.trim().to_string())
		} else {
			Err(DriverError::CommandFailed {
				cmd: program.to_string(),
				args: args.iter().map(|s| s.to_string()).collect(),
				stderr: self.stderr.trim().to_string(),
			})
		}
	}
}

/// Abstraction over process execution so drivers can be tested without the
/// real tools installed.
#[async_trait]
pub trait CommandRunner: Send + Sync {
	/// Runs `program` to completion. A non-zero exit is *not* an error here;
	/// only failing to start the process is.
	async fn run(&self, program: &str, args: &[&str], stdin: Option<&str>) -> DriverResult<CommandOutput>;

	/// Runs `program` and fails on a non-zero exit.
	async fn run_checked(&self, program: &str, args: &[&str], stdin: Option<&str>) -> DriverResult<String> {
		self.run(program, args, stdin).await?.into_stdout(program, args)
	}
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioCommandRunner;

impl TokioCommandRunner {
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl CommandRunner for TokioCommandRunner {
	async fn run(&self, program: &str, args: &[&str], stdin: Option<&str>) -> DriverResult<CommandOutput> {
		trace!(cmd = %format!("{} {}", program, args.join(" ")), "running command");

		let mut cmd = Command::new(program);
		cmd
			.args(args)
			.stdin(if stdin.is_some() {
				Stdio::piped()
			} else {
				Stdio::null()
			})
			.stdout(Stdio::piped())
			.stderr(Stdio::piped())
			.kill_on_drop(true);

		let mut child = cmd.spawn().map_err(|e| {
			if e.kind() == std::io::ErrorKind::NotFound {
				warn!(tool = program, "tool not found in PATH");
				DriverError::ToolNotFound {
					tool: program.to_string(),
				}
			} else {
				DriverError::Io(e)
			}
		})?;

		if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
			pipe.write_all(input.as_bytes()).await?;
			pipe.shutdown().await?;
		}

		let output = child.wait_with_output().await?;
		Ok(CommandOutput {
			status: output.status.code(),
			stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
			stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
		})
	}
}

#[cfg(test)]
pub(crate) mod testing {
	use std::collections::VecDeque;
	use std::sync::Mutex;

	use super::*;

	/// A recorded invocation: the full command line and any stdin.
	#[derive(Clone, Debug)]
	pub struct Invocation {
		pub line: String,
		pub stdin: Option<String>,
	}

	/// Replies to command lines by longest matching prefix. Each prefix holds a
	/// queue of replies; the last reply repeats. Unmatched commands succeed with
	/// empty output.
	#[derive(Default)]
	pub struct ScriptedRunner {
		replies: Mutex<Vec<(String, VecDeque<DriverResult<CommandOutput>>)>>,
		invocations: Mutex<Vec<Invocation>>,
	}

	impl ScriptedRunner {
		pub fn new() -> Self {
			Self::default()
		}

		pub fn reply(self, prefix: &str, output: CommandOutput) -> Self {
			self.push(prefix, Ok(output));
			self
		}

		pub fn missing(self, prefix: &str, tool: &str) -> Self {
			self.push(
				prefix,
				Err(DriverError::ToolNotFound {
					tool: tool.to_string(),
				}),
			);
			self
		}

		fn push(&self, prefix: &str, reply: DriverResult<CommandOutput>) {
			let mut replies = self.replies.lock().unwrap();
			match replies.iter_mut().find(|(p, _)| p == prefix) {
				Some((_, queue)) => queue.push_back(reply),
				None => replies.push((prefix.to_string(), VecDeque::from([reply]))),
			}
		}

		pub fn lines(&self) -> Vec<String> {
			self
				.invocations
				.lock()
				.unwrap()
				.iter()
				.map(|i| i.line.clone())
				.collect()
		}

		pub fn invocations(&self) -> Vec<Invocation> {
			self.invocations.lock().unwrap().clone()
		}
	}

	fn clone_reply(reply: &DriverResult<CommandOutput>) -> DriverResult<CommandOutput> {
		match reply {
			Ok(output) => Ok(output.clone()),
			Err(DriverError::ToolNotFound { tool }) => Err(DriverError::ToolNotFound { tool: tool.clone() }),
			Err(e) => Err(DriverError::Http(e.to_string())),
		}
	}

	#[async_trait]
	impl CommandRunner for ScriptedRunner {
		async fn run(&self, program: &str, args: &[&str], stdin: Option<&str>) -> DriverResult<CommandOutput> {
			let line = std::iter::once(program)
				.chain(args.iter().copied())
				.collect::<Vec<_>>()
				.join(" ");
			self.invocations.lock().unwrap().push(Invocation {
				line: line.clone(),
				stdin: stdin.map(str::to_string),
			});

			let mut replies = self.replies.lock().unwrap();
			let best = replies
				.iter_mut()
				.filter(|(prefix, _)| line.starts_with(prefix.as_str()))
				.max_by_key(|(prefix, _)| prefix.len());
			match best {
				Some((_, queue)) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| Ok(CommandOutput::ok(""))),
				Some((_, queue)) => queue.front().map(clone_reply).unwrap_or_else(|| Ok(CommandOutput::ok(""))),
				None => Ok(CommandOutput::ok("")),
			}
		}
	}
}
