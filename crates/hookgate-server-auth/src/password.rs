// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential hashing and verification.
//!
//! Hashes are PHC strings of the form
//! `$argon2id$v=19$m=<memory>,t=<iterations>,p=<parallelism>$<salt>$<hash>`
//! with unpadded base64 salt and hash. Verification reads the cost parameters
//! and salt from the string itself and compares outputs in constant time.
//!
//! Hashing is CPU-bound; async callers use [`CredentialHasher::hash_async`] and
//! [`CredentialHasher::verify_async`], which run on the blocking thread pool.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Version};
use hookgate_common_secret::SecretString;
use tracing::instrument;

use crate::argon2_config::{HashParams, SALT_LEN};
use crate::error::{AuthError, ValidationErrors};

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Stateless password hasher.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialHasher {
	params: HashParams,
}

impl CredentialHasher {
	pub fn new(params: HashParams) -> Self {
		Self { params }
	}

	pub fn params(&self) -> &HashParams {
		&self.params
	}

	/// Hash a password with a fresh random salt.
	///
	/// # Errors
	/// [`AuthError::Hashing`] if the entropy source or the KDF fails.
	pub fn hash(&self, password: &str) -> Result<String, AuthError> {
		let argon2 = self.params.argon2()?;

		let mut salt_bytes = [0u8; SALT_LEN];
		OsRng
			.try_fill_bytes(&mut salt_bytes)
			.map_err(|e| AuthError::Hashing(format!("entropy source failure: {e}")))?;
		let salt = SaltString::encode_b64(&salt_bytes)
			.map_err(|e| AuthError::Hashing(format!("salt encoding failed: {e}")))?;

		argon2
			.hash_password(password.as_bytes(), &salt)
			.map(|hash| hash.to_string())
			.map_err(|e| AuthError::Hashing(e.to_string()))
	}

	/// Verify a password against a stored hash.
	///
	/// Returns `Ok(false)` on mismatch.
	///
	/// # Errors
	/// [`AuthError::InvalidHashFormat`] if the hash cannot be parsed, is not
	/// Argon2id, or has an incompatible version.
	pub fn verify(&self, password: &str, encoded: &str) -> Result<bool, AuthError> {
		let parsed =
			PasswordHash::new(encoded).map_err(|e| AuthError::InvalidHashFormat(e.to_string()))?;

		if parsed.algorithm != Algorithm::Argon2id.ident() {
			return Err(AuthError::InvalidHashFormat(format!(
				"unsupported algorithm: {}",
				parsed.algorithm
			)));
		}
		if parsed.version != Some(Version::V0x13 as u32) {
			return Err(AuthError::InvalidHashFormat(
				"incompatible argon2 version".to_string(),
			));
		}
		if parsed.salt.is_none() || parsed.hash.is_none() {
			return Err(AuthError::InvalidHashFormat(
				"missing salt or hash".to_string(),
			));
		}

		// Cost parameters come from the hash string, not from self.params.
		match Argon2::default().verify_password(password.as_bytes(), &parsed) {
			Ok(()) => Ok(true),
			Err(password_hash::Error::Password) => Ok(false),
			Err(e) => Err(AuthError::InvalidHashFormat(e.to_string())),
		}
	}

	#[instrument(level = "debug", skip_all)]
	pub async fn hash_async(&self, password: SecretString) -> Result<String, AuthError> {
		let hasher = *self;
		tokio::task::spawn_blocking(move || hasher.hash(password.expose()))
			.await
			.map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))?
	}

	#[instrument(level = "debug", skip_all)]
	pub async fn verify_async(
		&self,
		password: SecretString,
		encoded: String,
	) -> Result<bool, AuthError> {
		let hasher = *self;
		tokio::task::spawn_blocking(move || hasher.verify(password.expose(), &encoded))
			.await
			.map_err(|e| AuthError::Internal(format!("verification task failed: {e}")))?
	}
}

/// Check a new password against the strength policy.
///
/// Every violated rule is reported under the `password` field.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationErrors> {
	let mut errors = ValidationErrors::new();
	let len = password.chars().count();

	if len < MIN_PASSWORD_LEN {
		errors.add(
			"password",
			format!("must be at least {MIN_PASSWORD_LEN} characters long"),
		);
	}
	if len > MAX_PASSWORD_LEN {
		errors.add(
			"password",
			format!("must be at most {MAX_PASSWORD_LEN} characters long"),
		);
	}
	if !password.chars().any(char::is_uppercase) {
		errors.add("password", "must contain at least one uppercase letter");
	}
	if !password.chars().any(char::is_lowercase) {
		errors.add("password", "must contain at least one lowercase letter");
	}
	if !password.chars().any(|c| c.is_ascii_digit()) {
		errors.add("password", "must contain at least one digit");
	}
	if !password
		.chars()
		.any(|c| !c.is_alphanumeric() && !c.is_whitespace())
	{
		errors.add("password", "must contain at least one special character");
	}

	errors.into_result()
}
