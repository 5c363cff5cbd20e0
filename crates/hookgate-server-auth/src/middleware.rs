// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Framework-independent stages of the auth enforcement chain.
//!
//! This module provides:
//! - [`Identity`] - the authenticated principal attached to a request
//! - [`AuthContext`] - auth state for request processing
//! - [`AuthConfig`] - which header carries the session token
//! - [`extract_session_token`] / [`resolve_identity`] / [`AccessRequirement`] -
//!   the three chain stages
//!
//! # Enforcement Flow
//!
//! ```text
//! Request → Extract token → Validate session → Identity → Authorize → handler
//!               │                  │                          │
//!               └ MissingCredential└ Unauthenticated          └ Forbidden
//! ```
//!
//! Extraction and resolution are mandatory on authenticated routes; the
//! authorization stage is attached per route. Resolution is the only stage that
//! touches the session store, and it does so with a single read.
//!
//! # Security Notes
//!
//! - Token values are never logged
//! - Session lookups that fail for any session reason collapse into
//!   [`AuthError::Unauthenticated`] so clients cannot tell missing and expired sessions apart

use http::header::{HeaderName, AUTHORIZATION};
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::context::RequestContext;
use crate::error::AuthError;
use crate::policy::AccessPolicy;
use crate::session::{Session, SessionAuthority, SessionToken};
use crate::types::{Permission, Role, UserId};

/// The authenticated principal for one request. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	pub user_id: UserId,
	pub role: Role,
}

impl Identity {
	pub fn new(user_id: UserId, role: Role) -> Self {
		Self { user_id, role }
	}
}

impl From<&Session> for Identity {
	fn from(session: &Session) -> Self {
		Self::new(session.user_id, session.role)
	}
}

/// Authentication state attached to a request.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
	identity: Option<Identity>,
}

impl AuthContext {
	pub fn unauthenticated() -> Self {
		Self { identity: None }
	}

	pub fn authenticated(identity: Identity) -> Self {
		Self {
			identity: Some(identity),
		}
	}

	pub fn identity(&self) -> Option<&Identity> {
		self.identity.as_ref()
	}

	pub fn is_authenticated(&self) -> bool {
		self.identity.is_some()
	}

	/// The identity, or [`AuthError::Unauthenticated`].
	pub fn require_identity(&self) -> Result<&Identity, AuthError> {
		self.identity.as_ref().ok_or(AuthError::Unauthenticated)
	}
}

/// Configuration for the enforcement chain.
#[derive(Debug, Clone)]
pub struct AuthConfig {
	/// Header carrying the session token.
	pub session_header: HeaderName,
}

impl Default for AuthConfig {
	fn default() -> Self {
		Self {
			session_header: AUTHORIZATION,
		}
	}
}

impl AuthConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_session_header(mut self, header: HeaderName) -> Self {
		self.session_header = header;
		self
	}
}

/// Read the session token from `header`.
///
/// Accepts either the raw token or `Bearer <token>`. Returns `None` when the
/// header is absent, not valid ASCII, or blank.
pub fn extract_session_token(headers: &HeaderMap, header: &HeaderName) -> Option<SessionToken> {
	let value = headers.get(header)?.to_str().ok()?.trim();
	// A scheme with nothing after it presents no credential.
	if value.eq_ignore_ascii_case("bearer") {
		return None;
	}
	let token = match value.split_once(' ') {
		Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
		_ => value,
	};
	if token.is_empty() || token.contains(char::is_whitespace) {
		return None;
	}
	Some(SessionToken::from_raw(token))
}

/// Resolve a presented token to an [`Identity`].
///
/// # Errors
/// - [`AuthError::Unauthenticated`] if the session is missing or expired
/// - store and deadline errors pass through unchanged
#[instrument(level = "debug", skip_all)]
pub async fn resolve_identity(
	sessions: &SessionAuthority,
	ctx: &RequestContext,
	token: &SessionToken,
) -> Result<Identity, AuthError> {
	match sessions.validate_session(ctx, token).await {
		Ok(session) => {
			let identity = Identity::from(&session);
			debug!(user_id = %identity.user_id, role = %identity.role, "identity resolved");
			Ok(identity)
		}
		Err(e) if e.is_session_failure() => {
			debug!(reason = %e, "session rejected");
			Err(AuthError::Unauthenticated)
		}
		Err(e) => {
			warn!(error = %e, "session resolution failed");
			Err(e)
		}
	}
}

/// A per-route authorization rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRequirement {
	Permission(Permission),
	Admin,
	/// The identity must own the resource or be an admin.
	OwnershipOrAdmin(UserId),
}

impl AccessRequirement {
	/// Check the rule. Any failure is reported as [`AuthError::Forbidden`].
	pub fn check(&self, policy: &AccessPolicy, identity: &Identity) -> Result<(), AuthError> {
		let result = match self {
			AccessRequirement::Permission(permission) => {
				policy.require_permission(identity, *permission)
			}
			AccessRequirement::Admin => policy.require_admin(identity),
			AccessRequirement::OwnershipOrAdmin(owner) => {
				policy.require_ownership_or_admin(identity, owner)
			}
		};
		result.map_err(|e| {
			debug!(
				user_id = %identity.user_id,
				role = %identity.role,
				requirement = ?self,
				reason = %e,
				"access denied"
			);
			AuthError::Forbidden
		})
	}
}
