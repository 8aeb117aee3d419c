// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Thin wrapper over the `kubectl` CLI shared by the Kubernetes drivers.

use std::sync::Arc;

use serde_json::Value;
use stagehand_core::{DriverError, DriverResult};
use tracing::debug;

use crate::command::CommandRunner;

pub const KUBECTL: &str = "kubectl";

/// Issues kubectl commands, optionally pinned to a kubeconfig context.
#[derive(Clone)]
pub struct Kubectl {
	runner: Arc<dyn CommandRunner>,
	context: Option<String>,
}

impl Kubectl {
	pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
		Self {
			runner,
			context: None,
		}
	}

	pub fn with_context(mut self, context: impl Into<String>) -> Self {
		self.context = Some(context.into());
		self
	}

	fn args<'a>(&'a self, namespace: Option<&'a str>, rest: &[&'a str]) -> Vec<&'a str> {
		let mut args = Vec::with_capacity(rest.len() + 4);
		if let Some(context) = &self.context {
			args.push("--context");
			args.push(context.as_str());
		}
		if let Some(ns) = namespace {
			args.push("-n");
			args.push(ns);
		}
		args.extend_from_slice(rest);
		args
	}

	/// Runs kubectl and returns trimmed stdout.
	pub async fn run(&self, namespace: Option<&str>, rest: &[&str], stdin: Option<&str>) -> DriverResult<String> {
		let args = self.args(namespace, rest);
		self.runner.run_checked(KUBECTL, &args, stdin).await
	}

	pub async fn exists(&self, resource: &str, name: &str, namespace: Option<&str>) -> DriverResult<bool> {
		let out = self
			.run(
				namespace,
				&["get", resource, name, "--ignore-not-found", "-o", "name"],
				None,
			)
			.await?;
		Ok(!out.is_empty())
	}

	/// Fetches the object as JSON, `None` when it does not exist.
	pub async fn get_json(&self, resource: &str, name: &str, namespace: Option<&str>) -> DriverResult<Option<Value>> {
		let out = self
			.run(
				namespace,
				&["get", resource, name, "--ignore-not-found", "-o", "json"],
				None,
			)
			.await?;
		if out.is_empty() {
			return Ok(None);
		}
		serde_json::from_str(&out)
			.map(Some)
			.map_err(|e| DriverError::parse(format!("{resource}/{name} json"), e.to_string()))
	}

	pub async fn jsonpath(
		&self,
		resource: &str,
		name: &str,
		namespace: Option<&str>,
		path: &str,
	) -> DriverResult<String> {
		let output = format!("jsonpath={path}");
		self
			.run(namespace, &["get", resource, name, "-o", output.as_str()], None)
			.await
	}

	pub async fn apply_stdin(&self, namespace: Option<&str>, manifest: &str) -> DriverResult<()> {
		self.run(namespace, &["apply", "-f", "-"], Some(manifest)).await?;
		Ok(())
	}

	pub async fn apply_url(&self, namespace: Option<&str>, url: &str) -> DriverResult<()> {
		self.run(namespace, &["apply", "-f", url], None).await?;
		Ok(())
	}

	/// Issues a non-blocking delete; removal is confirmed by polling.
	pub async fn delete(&self, resource: &str, name: &str, namespace: Option<&str>) -> DriverResult<()> {
		self
			.run(
				namespace,
				&["delete", resource, name, "--ignore-not-found", "--wait=false"],
				None,
			)
			.await?;
		Ok(())
	}

	pub async fn clear_finalizers(&self, resource: &str, name: &str, namespace: Option<&str>) -> DriverResult<()> {
		debug!(resource, name, "clearing finalizers");
		self
			.run(
				namespace,
				&[
					"patch",
					resource,
					name,
					"--type=merge",
					"-p",
					r#"{"metadata":{"finalizers":null}}"#,
				],
				None,
			)
			.await?;
		Ok(())
	}

	pub async fn describe(&self, resource: &str, name: &str, namespace: Option<&str>) -> DriverResult<String> {
		self.run(namespace, &["describe", resource, name], None).await
	}

	pub async fn events(&self, namespace: &str) -> DriverResult<String> {
		self
			.run(
				Some(namespace),
				&["get", "events", "--sort-by=.lastTimestamp"],
				None,
			)
			.await
	}
}

/// Joins diagnostic sections, keeping failures inline instead of dropping
/// the rest of the dump.
pub(crate) fn dump_sections(sections: Vec<(&str, DriverResult<String>)>) -> String {
	sections
		.into_iter()
		.map(|(title, body)| match body {
			Ok(body) => format!("--- {title} ---\n{body}"),
			Err(e) => format!("--- {title} ---\nunavailable: {e}"),
		})
		.collect::<Vec<_>>()
		.join("\n")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::command::testing::ScriptedRunner;
	use crate::command::CommandOutput;

	#[tokio::test]
	async fn context_and_namespace_precede_verb() {
		let runner = Arc::new(ScriptedRunner::new());
		let kubectl = Kubectl::new(runner.clone()).with_context("kind-demo");

		kubectl.exists("namespace", "mongodb", None).await.unwrap();
		kubectl.delete("secret", "admin", Some("mongodb")).await.unwrap();

		assert_eq!(
			runner.lines(),
			vec![
				"kubectl --context kind-demo get namespace mongodb --ignore-not-found -o name",
				"kubectl --context kind-demo -n mongodb delete secret admin --ignore-not-found --wait=false",
			]
		);
	}

	#[tokio::test]
	async fn get_json_treats_empty_output_as_absent() {
		let runner = Arc::new(
			ScriptedRunner::new().reply("kubectl get statefulset om", CommandOutput::ok("\n")),
		);
		let kubectl = Kubectl::new(runner);
		assert!(kubectl.get_json("statefulset", "om", None).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn get_json_rejects_garbage() {
		let runner = Arc::new(
			ScriptedRunner::new().reply("kubectl get deployment op", CommandOutput::ok("not json")),
		);
		let err = Kubectl::new(runner)
			.get_json("deployment", "op", None)
			.await
			.unwrap_err();
		assert!(matches!(err, DriverError::Parse { .. }));
	}

	#[test]
	fn dump_keeps_failed_sections() {
		let dump = dump_sections(vec![
			("describe", Ok("Name: om".to_string())),
			("events", Err(DriverError::Http("boom".to_string()))),
		]);
		assert!(dump.contains("--- describe ---\nName: om"));
		assert!(dump.contains("--- events ---\nunavailable: HTTP probe failed: boom"));
	}
}
