// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod args;
mod plan;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use stagehand_config::{load_config, LoggingConfig, Platform};
use stagehand_core::{
	FileAuditSink, OrchestratorConfig, ProvisioningOrchestrator, RunReport, Step, StepOutcome,
	EXIT_FAILURE, EXIT_SUCCESS,
};
use stagehand_drivers::{
	default_registry, CommandRunner, CommandToolCheck, HttpProbe, TokioCommandRunner,
	DEFAULT_PROBE_TIMEOUT,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::args::Args;

/// kind drives docker unless told otherwise.
const KIND_PROVIDER_ENV: &str = "KIND_EXPERIMENTAL_PROVIDER";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let args = Args::parse();
	let code = match run(args).await {
		Ok(code) => code,
		Err(e) => {
			error!(error = ?e, "stagehand failed");
			eprintln!("error: {e:#}");
			EXIT_FAILURE
		}
	};
	ExitCode::from(u8::try_from(code).unwrap_or(1))
}

async fn run(args: Args) -> Result<i32> {
	let config = load_config(args.config.as_deref(), args.overrides())
		.context("failed to load configuration")?;
	init_tracing(&config.logging);

	let mode = args.mode();
	let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner::new());
	let probe = HttpProbe::new(DEFAULT_PROBE_TIMEOUT)?;
	let registry = default_registry(runner.clone(), probe, &config.cluster.container_runtime);

	let orchestrator = ProvisioningOrchestrator::new(registry, plan::build_plan(&config))
		.with_tool_check(Arc::new(CommandToolCheck::new(runner)))
		.with_config(OrchestratorConfig {
			deletion_timeout: config.timeouts.deletion(),
			force_timeout: config.timeouts.force(),
		});

	if args.dry_run {
		print!("{}", render_steps(&orchestrator.steps(mode)));
		return Ok(EXIT_SUCCESS);
	}

	if config.platform == Platform::Kind {
		configure_kind_provider(&config.cluster.container_runtime);
	}

	let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
	let log_path = config.logging.run_log_path(&timestamp, mode.as_str());
	let sink = FileAuditSink::open(&log_path)
		.with_context(|| format!("failed to open run log {}", log_path.display()))?;

	info!(
		mode = %mode,
		platform = %config.platform,
		log = %log_path.display(),
		"starting run"
	);
	let report = orchestrator.run(mode, Box::new(sink)).await;
	summarize(&report, &log_path);

	Ok(report.exit_code())
}

fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_writer(std::io::stderr))
		.init();
}

fn configure_kind_provider(runtime: &str) {
	if runtime == "docker" || std::env::var_os(KIND_PROVIDER_ENV).is_some() {
		return;
	}
	info!(provider = runtime, "selecting kind node provider");
	std::env::set_var(KIND_PROVIDER_ENV, runtime);
}

fn render_steps(steps: &[Step]) -> String {
	steps
		.iter()
		.enumerate()
		.map(|(i, step)| {
			let budget = step.spec.readiness_timeout.as_secs();
			format!("{:>2}. {} {} (budget {budget}s)\n", i + 1, step.mode, step.id())
		})
		.collect()
}

fn summarize(report: &RunReport, log_path: &Path) {
	for failure in &report.failures {
		warn!(error = %failure, "teardown left work behind");
	}
	let counts = (
		report.count(StepOutcome::Success),
		report.count(StepOutcome::Failed),
		report.count(StepOutcome::TimedOut),
		report.count(StepOutcome::Skipped),
	);
	match &report.fatal {
		Some(fatal) => error!(
			run_id = %report.run_id,
			error = %fatal,
			exit_code = report.exit_code(),
			log = %log_path.display(),
			"run aborted"
		),
		None => info!(
			run_id = %report.run_id,
			succeeded = counts.0,
			failed = counts.1,
			timed_out = counts.2,
			skipped = counts.3,
			creates = report.creates,
			log = %log_path.display(),
			"run finished"
		),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use stagehand_config::StagehandConfig;
	use stagehand_core::{plan_steps, StepMode};

	#[test]
	fn render_steps_numbers_destroy_in_reverse() {
		let resources = plan::kind_plan(&StagehandConfig::default());
		let rendered = render_steps(&plan_steps(&resources, StepMode::Destroy));
		let lines: Vec<_> = rendered.lines().collect();

		assert_eq!(lines.len(), resources.len());
		assert!(lines[0].starts_with(" 1. destroy custom-resource/mongodb/demo-replica-set"));
		assert!(lines.last().unwrap().contains("cluster/"));
	}

	#[tokio::test]
	async fn dry_run_touches_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let args = Args::parse_from([
			"stagehand",
			"--dry-run",
			"--config",
			dir.path().join("absent.toml").to_str().unwrap(),
			"--log-dir",
			dir.path().join("logs").to_str().unwrap(),
		]);

		assert_eq!(run(args).await.unwrap(), EXIT_SUCCESS);
		assert!(!dir.path().join("logs").exists());
	}
}
