// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session store backend selection.

use std::fmt;
use std::str::FromStr;

use hookgate_common_secret::SecretString;
use serde::Deserialize;

/// Which key-value store holds sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
	#[default]
	Memory,
	Redis,
}

impl fmt::Display for StoreBackend {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StoreBackend::Memory => f.write_str("memory"),
			StoreBackend::Redis => f.write_str("redis"),
		}
	}
}

impl FromStr for StoreBackend {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"memory" => Ok(StoreBackend::Memory),
			"redis" => Ok(StoreBackend::Redis),
			other => Err(format!("unknown store backend '{other}' (expected memory or redis)")),
		}
	}
}

/// Store configuration (runtime, fully resolved).
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
	pub backend: StoreBackend,
	/// Connection URL; may embed a password.
	pub redis_url: Option<SecretString>,
}

/// Store configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfigLayer {
	#[serde(default)]
	pub backend: Option<StoreBackend>,
	#[serde(default)]
	pub redis_url: Option<SecretString>,
}

impl StoreConfigLayer {
	pub fn merge(&mut self, other: StoreConfigLayer) {
		if other.backend.is_some() {
			self.backend = other.backend;
		}
		if other.redis_url.is_some() {
			self.redis_url = other.redis_url;
		}
	}

	pub fn finalize(self) -> StoreConfig {
		StoreConfig {
			backend: self.backend.unwrap_or_default(),
			redis_url: self.redis_url,
		}
	}
}
