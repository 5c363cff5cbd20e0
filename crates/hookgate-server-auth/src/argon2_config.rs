// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Argon2 configuration for password hashing.
//!
//! New hashes are always Argon2id, version 0x13, with the cost parameters in
//! [`HashParams`]. The defaults are:
//! - Memory: 65536 KiB (64 MiB)
//! - Iterations: 3
//! - Parallelism: 2
//! - Output: 32 bytes
//!
//! Parameters are embedded in every hash string, so changing them only affects
//! newly created hashes.
//!
//! # Security Note
//!
//! [`HashParams::insecure_fast`] exists for tests and MUST NOT be used in
//! production.

use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::AuthError;

pub const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
pub const DEFAULT_ITERATIONS: u32 = 3;
pub const DEFAULT_PARALLELISM: u32 = 2;
pub const DEFAULT_OUTPUT_LEN: usize = 32;

/// Salt length in bytes for new hashes.
pub const SALT_LEN: usize = 16;

/// Argon2id cost parameters used when creating new hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
	pub memory_kib: u32,
	pub iterations: u32,
	pub parallelism: u32,
	pub output_len: usize,
}

impl Default for HashParams {
	fn default() -> Self {
		Self {
			memory_kib: DEFAULT_MEMORY_KIB,
			iterations: DEFAULT_ITERATIONS,
			parallelism: DEFAULT_PARALLELISM,
			output_len: DEFAULT_OUTPUT_LEN,
		}
	}
}

impl HashParams {
	pub fn new(memory_kib: u32, iterations: u32, parallelism: u32, output_len: usize) -> Self {
		Self {
			memory_kib,
			iterations,
			parallelism,
			output_len,
		}
	}

	/// Minimal-cost parameters for fast test execution.
	pub fn insecure_fast() -> Self {
		Self::new(1024, 1, 1, DEFAULT_OUTPUT_LEN)
	}

	/// Check that Argon2 accepts these parameters.
	pub fn validate(&self) -> Result<(), AuthError> {
		self.argon2().map(|_| ())
	}

	/// Build an Argon2id instance with these parameters.
	pub(crate) fn argon2(&self) -> Result<Argon2<'static>, AuthError> {
		let params = Params::new(
			self.memory_kib,
			self.iterations,
			self.parallelism,
			Some(self.output_len),
		)
		.map_err(|e| AuthError::Hashing(format!("invalid argon2 parameters: {e}")))?;
		Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
	}
}
