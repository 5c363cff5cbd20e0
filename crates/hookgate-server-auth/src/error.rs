// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the auth core.
//!
//! Every [`AuthError`] variant maps to an HTTP status code and a stable,
//! machine-readable error code. Messages never contain credential material.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Aggregated field-level validation failures.
///
/// Keys are field names, values are human-readable messages. Ordering is
/// deterministic so responses and test assertions are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
	fields: BTreeMap<String, String>,
}

impl ValidationErrors {
	pub fn new() -> Self {
		Self::default()
	}

	/// A map holding exactly one failure.
	pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
		let mut errors = Self::new();
		errors.add(field, message);
		errors
	}

	/// Record a failure for `field`. A second failure on the same field is
	/// appended to the first.
	pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
		let message = message.into();
		self
			.fields
			.entry(field.into())
			.and_modify(|existing| {
				existing.push_str("; ");
				existing.push_str(&message);
			})
			.or_insert(message);
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn get(&self, field: &str) -> Option<&str> {
		self.fields.get(field).map(String::as_str)
	}

	pub fn fields(&self) -> &BTreeMap<String, String> {
		&self.fields
	}

	/// `Ok(())` when nothing was recorded, otherwise `Err(self)`.
	pub fn into_result(self) -> std::result::Result<(), ValidationErrors> {
		if self.is_empty() {
			Ok(())
		} else {
			Err(self)
		}
	}
}

impl fmt::Display for ValidationErrors {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut first = true;
		for (field, message) in &self.fields {
			if !first {
				f.write_str(", ")?;
			}
			write!(f, "{field}: {message}")?;
			first = false;
		}
		Ok(())
	}
}

impl std::error::Error for ValidationErrors {}

/// Errors produced by the auth core.
#[derive(Debug, Error)]
pub enum AuthError {
	#[error("invalid credentials")]
	InvalidCredentials,

	#[error("account is inactive")]
	AccountInactive,

	#[error("missing session credential")]
	MissingCredential,

	#[error("authentication required")]
	Unauthenticated,

	#[error("session not found")]
	SessionNotFound,

	#[error("session expired")]
	SessionExpired,

	#[error("insufficient permissions")]
	InsufficientPermissions,

	#[error("admin privileges required")]
	AdminRequired,

	#[error("forbidden")]
	Forbidden,

	#[error("user not found")]
	UserNotFound,

	#[error("validation failed: {0}")]
	Validation(#[from] ValidationErrors),

	#[error("auth_config is required when changing auth_type")]
	AuthConfigRequired,

	#[error("setup has already been completed")]
	SetupAlreadyCompleted,

	#[error("session store unavailable: {0}")]
	StoreUnavailable(String),

	#[error("request deadline exceeded")]
	DeadlineExceeded,

	#[error("password hashing failed: {0}")]
	Hashing(String),

	#[error("invalid credential hash: {0}")]
	InvalidHashFormat(String),

	#[error("internal error: {0}")]
	Internal(String),
}

impl AuthError {
	/// HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			AuthError::InvalidCredentials
			| AuthError::MissingCredential
			| AuthError::Unauthenticated
			| AuthError::SessionNotFound
			| AuthError::SessionExpired => 401,
			AuthError::AccountInactive
			| AuthError::InsufficientPermissions
			| AuthError::AdminRequired
			| AuthError::Forbidden => 403,
			AuthError::UserNotFound => 404,
			AuthError::SetupAlreadyCompleted => 409,
			AuthError::Validation(_) | AuthError::AuthConfigRequired => 422,
			AuthError::StoreUnavailable(_) => 503,
			AuthError::DeadlineExceeded => 504,
			AuthError::Hashing(_) | AuthError::InvalidHashFormat(_) | AuthError::Internal(_) => 500,
		}
	}

	/// Stable error code for API responses.
	pub fn error_code(&self) -> &'static str {
		match self {
			AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
			AuthError::AccountInactive => "ACCOUNT_INACTIVE",
			AuthError::MissingCredential => "MISSING_CREDENTIAL",
			AuthError::Unauthenticated => "UNAUTHENTICATED",
			AuthError::SessionNotFound => "SESSION_NOT_FOUND",
			AuthError::SessionExpired => "SESSION_EXPIRED",
			AuthError::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
			AuthError::AdminRequired => "ADMIN_REQUIRED",
			AuthError::Forbidden => "FORBIDDEN",
			AuthError::UserNotFound => "USER_NOT_FOUND",
			AuthError::Validation(_) => "VALIDATION_FAILED",
			AuthError::AuthConfigRequired => "AUTH_CONFIG_REQUIRED",
			AuthError::SetupAlreadyCompleted => "SETUP_ALREADY_COMPLETED",
			AuthError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
			AuthError::DeadlineExceeded => "DEADLINE_EXCEEDED",
			AuthError::Hashing(_) => "HASHING_FAILED",
			AuthError::InvalidHashFormat(_) => "INVALID_HASH_FORMAT",
			AuthError::Internal(_) => "INTERNAL_ERROR",
		}
	}

	/// True for errors whose detail must not be shown to API clients.
	pub fn is_server_error(&self) -> bool {
		self.status_code() >= 500
	}

	/// True when the error means the presented session is unusable.
	pub fn is_session_failure(&self) -> bool {
		matches!(self, AuthError::SessionNotFound | AuthError::SessionExpired)
	}
}

impl From<StoreError> for AuthError {
	fn from(err: StoreError) -> Self {
		AuthError::StoreUnavailable(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, AuthError>;
