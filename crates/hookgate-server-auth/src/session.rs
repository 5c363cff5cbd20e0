// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server-side session lifecycle.
//!
//! A session is an opaque 256-bit random token (hex encoded) mapped to a
//! record in an expiring key-value store under `session:<token>`:
//!
//! ```json
//! {"id": "...", "user_id": "...", "role": "developer",
//!  "created_at": "...", "expires_at": "..."}
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! create ──► active ──► (refresh)* ──► expired | revoked
//! ```
//!
//! The record's `expires_at` is authoritative. A record the store has not yet
//! evicted is still rejected once `expires_at` has passed, and is deleted on
//! that read.
//!
//! # Security Notes
//!
//! - Tokens come from the OS CSPRNG and are unrelated to user id or role
//! - Tokens are never logged; [`SessionToken`]'s `Debug` is redacted
//! - Deleting a record revokes the session immediately

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hookgate_common_secret::REDACTED;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::context::RequestContext;
use crate::error::AuthError;
use crate::store::KeyValueStore;
use crate::types::{Role, UserId};

/// Prefix for session keys in the store.
pub const SESSION_KEY_PREFIX: &str = "session:";

/// Number of random bytes in a session token.
pub const SESSION_TOKEN_BYTES: usize = 32;

/// Default session lifetime: 24 hours.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest accepted session lifetime: 365 days.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Opaque session token presented by clients.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
	/// Generate a new random token.
	///
	/// # Errors
	/// [`AuthError::Internal`] if the OS entropy source fails.
	pub fn generate() -> Result<Self, AuthError> {
		let mut bytes = [0u8; SESSION_TOKEN_BYTES];
		OsRng
			.try_fill_bytes(&mut bytes)
			.map_err(|e| AuthError::Internal(format!("entropy source failure: {e}")))?;
		Ok(Self(hex::encode(bytes)))
	}

	/// Wrap a token received from a client.
	pub fn from_raw(raw: impl Into<String>) -> Self {
		Self(raw.into())
	}

	/// Borrow the raw token. Callers must not log it.
	pub fn expose(&self) -> &str {
		&self.0
	}

	fn store_key(&self) -> String {
		format!("{SESSION_KEY_PREFIX}{}", self.0)
	}
}

impl fmt::Debug for SessionToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SessionToken({REDACTED})")
	}
}

/// A stored session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	pub id: SessionToken,
	pub user_id: UserId,
	/// Role at the time the session was created.
	pub role: Role,
	pub created_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

impl Session {
	pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
		now > self.expires_at
	}
}

/// Session lifetime settings.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
	pub ttl: Duration,
	/// Extend the session on every successful validation.
	pub sliding: bool,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			ttl: DEFAULT_SESSION_TTL,
			sliding: false,
		}
	}
}

/// Issues, validates, refreshes and revokes sessions.
///
/// Holds no session state itself; every operation is a single store round
/// trip (plus a delete on expiry), so concurrent callers need no locking.
/// Concurrent refreshes are last-write-wins. A refresh racing a delete never
/// brings the session back: extensions only overwrite a record that still
/// exists.
#[derive(Clone)]
pub struct SessionAuthority {
	store: Arc<dyn KeyValueStore>,
	config: SessionConfig,
}

impl fmt::Debug for SessionAuthority {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SessionAuthority")
			.field("store", &self.store.backend_name())
			.field("config", &self.config)
			.finish()
	}
}

impl SessionAuthority {
	pub fn new(store: Arc<dyn KeyValueStore>, config: SessionConfig) -> Self {
		Self { store, config }
	}

	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Create and persist a new session.
	#[instrument(level = "debug", skip_all, fields(user_id = %user_id, role = %role))]
	pub async fn create_session(
		&self,
		ctx: &RequestContext,
		user_id: UserId,
		role: Role,
	) -> Result<Session, AuthError> {
		let now = Utc::now();
		let session = Session {
			id: SessionToken::generate()?,
			user_id,
			role,
			created_at: now,
			expires_at: self.expiry_from(now)?,
		};

		self.write(ctx, &session, now).await?;
		debug!(expires_at = %session.expires_at, "session created");
		Ok(session)
	}

	/// Look up a session and check it has not expired.
	///
	/// # Errors
	/// - [`AuthError::SessionNotFound`] if no record exists
	/// - [`AuthError::SessionExpired`] if `expires_at` has passed; the record
	///   is deleted first
	#[instrument(level = "debug", skip_all)]
	pub async fn validate_session(
		&self,
		ctx: &RequestContext,
		token: &SessionToken,
	) -> Result<Session, AuthError> {
		let session = self.load_active(ctx, token).await?;

		if self.config.sliding {
			return self.extend(ctx, session).await;
		}
		Ok(session)
	}

	/// Push `expires_at` to now + TTL and rewrite the record.
	///
	/// The new expiry never moves backwards.
	#[instrument(level = "debug", skip_all)]
	pub async fn refresh_session(
		&self,
		ctx: &RequestContext,
		token: &SessionToken,
	) -> Result<Session, AuthError> {
		let session = self.load_active(ctx, token).await?;
		self.extend(ctx, session).await
	}

	/// Remove a session. Deleting an absent session succeeds.
	#[instrument(level = "debug", skip_all)]
	pub async fn delete_session(
		&self,
		ctx: &RequestContext,
		token: &SessionToken,
	) -> Result<(), AuthError> {
		ctx.run(self.store.delete(&token.store_key())).await?;
		debug!("session deleted");
		Ok(())
	}

	async fn load_active(
		&self,
		ctx: &RequestContext,
		token: &SessionToken,
	) -> Result<Session, AuthError> {
		let raw = ctx
			.run(self.store.get(&token.store_key()))
			.await?
			.ok_or(AuthError::SessionNotFound)?;

		let session: Session = serde_json::from_str(&raw)
			.map_err(|e| AuthError::Internal(format!("corrupt session record: {e}")))?;

		if session.is_expired_at(Utc::now()) {
			debug!(user_id = %session.user_id, "session expired, deleting");
			ctx.run(self.store.delete(&token.store_key())).await?;
			return Err(AuthError::SessionExpired);
		}
		Ok(session)
	}

	async fn extend(&self, ctx: &RequestContext, mut session: Session) -> Result<Session, AuthError> {
		let now = Utc::now();
		let candidate = self.expiry_from(now)?;
		if candidate > session.expires_at {
			session.expires_at = candidate;
		}

		let (record, store_ttl) = encode(&session, now)?;
		let replaced = ctx
			.run(self.store.replace(&session.id.store_key(), &record, store_ttl))
			.await?;
		if !replaced {
			debug!(user_id = %session.user_id, "session deleted during refresh");
			return Err(AuthError::SessionNotFound);
		}

		debug!(user_id = %session.user_id, expires_at = %session.expires_at, "session refreshed");
		Ok(session)
	}

	async fn write(
		&self,
		ctx: &RequestContext,
		session: &Session,
		now: DateTime<Utc>,
	) -> Result<(), AuthError> {
		let (record, store_ttl) = encode(session, now)?;
		ctx
			.run(self.store.set(&session.id.store_key(), &record, store_ttl))
			.await
	}

	/// `now + ttl`, or [`AuthError::Internal`] if that is not representable.
	fn expiry_from(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, AuthError> {
		chrono::Duration::from_std(self.config.ttl)
			.ok()
			.and_then(|ttl| now.checked_add_signed(ttl))
			.ok_or_else(|| {
				AuthError::Internal(format!(
					"session ttl of {}s is out of range",
					self.config.ttl.as_secs()
				))
			})
	}
}

fn encode(session: &Session, now: DateTime<Utc>) -> Result<(String, Duration), AuthError> {
	let record = serde_json::to_string(session)
		.map_err(|e| AuthError::Internal(format!("failed to encode session: {e}")))?;
	let store_ttl = (session.expires_at - now).to_std().unwrap_or(Duration::ZERO);
	Ok((record, store_ttl))
}
