// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Session and enforcement-chain configuration.

use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
/// 365 days.
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;
pub const DEFAULT_SESSION_HEADER: &str = "Authorization";

/// Auth configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct AuthConfig {
	pub session_ttl_secs: u64,
	/// Header carrying the session token.
	pub session_header: String,
	/// Extend sessions on every successful validation.
	pub sliding_sessions: bool,
}

impl Default for AuthConfig {
	fn default() -> Self {
		AuthConfigLayer::default().finalize()
	}
}

impl AuthConfig {
	pub fn session_ttl(&self) -> Duration {
		Duration::from_secs(self.session_ttl_secs)
	}
}

/// Auth configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub session_ttl_secs: Option<u64>,
	#[serde(default)]
	pub session_header: Option<String>,
	#[serde(default)]
	pub sliding_sessions: Option<bool>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.session_ttl_secs.is_some() {
			self.session_ttl_secs = other.session_ttl_secs;
		}
		if other.session_header.is_some() {
			self.session_header = other.session_header;
		}
		if other.sliding_sessions.is_some() {
			self.sliding_sessions = other.sliding_sessions;
		}
	}

	pub fn finalize(self) -> AuthConfig {
		AuthConfig {
			session_ttl_secs: self.session_ttl_secs.unwrap_or(DEFAULT_SESSION_TTL_SECS),
			session_header: self
				.session_header
				.unwrap_or_else(|| DEFAULT_SESSION_HEADER.to_string()),
			sliding_sessions: self.sliding_sessions.unwrap_or(false),
		}
	}
}
