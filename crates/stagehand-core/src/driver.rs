// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DriverResult;
use crate::resource::{Observation, ResourceKind, ResourceSpec};

/// Per-kind adapter the engine drives. The only boundary the core depends on.
///
/// Callers check [`exists`](Self::exists) before [`create`](Self::create), so
/// implementations do not need to tolerate "already exists" themselves.
/// [`delete`](Self::delete) only issues the request; removal is confirmed by
/// polling `exists`.
#[async_trait]
pub trait ResourceDriver: Send + Sync {
	/// Short name used in logs.
	fn name(&self) -> &'static str;

	/// External executables this driver shells out to.
	fn required_tools(&self) -> Vec<&str> {
		Vec::new()
	}

	async fn exists(&self, spec: &ResourceSpec) -> DriverResult<bool>;

	async fn create(&self, spec: &ResourceSpec) -> DriverResult<()>;

	async fn is_ready(&self, spec: &ResourceSpec) -> DriverResult<Observation>;

	async fn delete(&self, spec: &ResourceSpec) -> DriverResult<()>;

	/// Strips protections (finalizers, volumes, dependents) and reissues the delete.
	async fn force_delete(&self, spec: &ResourceSpec) -> DriverResult<()>;

	/// Descriptive dump captured when a wait times out.
	async fn diagnostics(&self, spec: &ResourceSpec) -> DriverResult<String>;
}

/// Checks that an external tool can be executed.
#[async_trait]
pub trait ToolCheck: Send + Sync {
	async fn is_available(&self, tool: &str) -> bool;
}

/// Maps each resource kind to the single driver that serves it.
#[derive(Clone, Default)]
pub struct DriverRegistry {
	drivers: HashMap<ResourceKind, Arc<dyn ResourceDriver>>,
}

impl DriverRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `driver` for `kind`, replacing any previous registration.
	pub fn register(&mut self, kind: ResourceKind, driver: Arc<dyn ResourceDriver>) {
		self.drivers.insert(kind, driver);
	}

	pub fn with(mut self, kind: ResourceKind, driver: Arc<dyn ResourceDriver>) -> Self {
		self.register(kind, driver);
		self
	}

	pub fn get(&self, kind: ResourceKind) -> Option<&Arc<dyn ResourceDriver>> {
		self.drivers.get(&kind)
	}

	pub fn kinds(&self) -> Vec<ResourceKind> {
		let mut kinds: Vec<_> = self.drivers.keys().copied().collect();
		kinds.sort();
		kinds
	}
}

impl std::fmt::Debug for DriverRegistry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let mut map = f.debug_map();
		for kind in self.kinds() {
			if let Some(driver) = self.drivers.get(&kind) {
				map.entry(&kind, &driver.name());
			}
		}
		map.finish()
	}
}
