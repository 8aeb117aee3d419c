// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ops Manager and replica set configuration sections.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OpsManagerConfigLayer {
	pub name: Option<String>,
	pub version: Option<String>,
	pub admin_user: Option<String>,
	pub admin_password: Option<String>,
	pub port: Option<u16>,
	pub app_db_members: Option<u32>,
}

impl fmt::Debug for OpsManagerConfigLayer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OpsManagerConfigLayer")
			.field("name", &self.name)
			.field("version", &self.version)
			.field("admin_user", &self.admin_user)
			.field("admin_password", &self.admin_password.as_ref().map(|_| "[REDACTED]"))
			.field("port", &self.port)
			.field("app_db_members", &self.app_db_members)
			.finish()
	}
}

impl OpsManagerConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.name.is_some() {
			self.name = other.name;
		}
		if other.version.is_some() {
			self.version = other.version;
		}
		if other.admin_user.is_some() {
			self.admin_user = other.admin_user;
		}
		if other.admin_password.is_some() {
			self.admin_password = other.admin_password;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.app_db_members.is_some() {
			self.app_db_members = other.app_db_members;
		}
	}

	pub fn finalize(self) -> OpsManagerConfig {
		OpsManagerConfig {
			name: self.name.unwrap_or_else(|| "ops-manager".to_string()),
			version: self.version.unwrap_or_else(|| "7.0.12".to_string()),
			admin_user: self.admin_user.unwrap_or_else(|| "admin".to_string()),
			admin_password: self.admin_password.unwrap_or_else(|| "Passw0rd.".to_string()),
			port: self.port.unwrap_or(8080),
			app_db_members: self.app_db_members.unwrap_or(3),
		}
	}
}

#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct OpsManagerConfig {
	pub name: String,
	pub version: String,
	pub admin_user: String,
	pub admin_password: String,
	pub port: u16,
	pub app_db_members: u32,
}

impl OpsManagerConfig {
	/// Login page polled to decide that the application is serving.
	pub fn login_url(&self, host: &str) -> String {
		format!("http://{host}:{}/user/login", self.port)
	}
}

impl fmt::Debug for OpsManagerConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("OpsManagerConfig")
			.field("name", &self.name)
			.field("version", &self.version)
			.field("admin_user", &self.admin_user)
			.field("admin_password", &"[REDACTED]")
			.field("port", &self.port)
			.field("app_db_members", &self.app_db_members)
			.finish()
	}
}

impl Default for OpsManagerConfig {
	fn default() -> Self {
		OpsManagerConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReplicaSetConfigLayer {
	pub name: Option<String>,
	pub members: Option<u32>,
	pub version: Option<String>,
	pub port: Option<u16>,
}

impl ReplicaSetConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.name.is_some() {
			self.name = other.name;
		}
		if other.members.is_some() {
			self.members = other.members;
		}
		if other.version.is_some() {
			self.version = other.version;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
	}

	pub fn finalize(self) -> ReplicaSetConfig {
		ReplicaSetConfig {
			name: self.name.unwrap_or_else(|| "demo-replica-set".to_string()),
			members: self.members.unwrap_or(3),
			version: self.version.unwrap_or_else(|| "7.0.12-ent".to_string()),
			port: self.port.unwrap_or(27017),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicaSetConfig {
	pub name: String,
	pub members: u32,
	/// MongoDB server version, `-ent` suffix for Enterprise builds.
	pub version: String,
	pub port: u16,
}

impl Default for ReplicaSetConfig {
	fn default() -> Self {
		ReplicaSetConfigLayer::default().finalize()
	}
}
