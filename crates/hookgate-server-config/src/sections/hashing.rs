// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Argon2id cost parameters for new password hashes.

use serde::Deserialize;

pub const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
pub const DEFAULT_ITERATIONS: u32 = 3;
pub const DEFAULT_PARALLELISM: u32 = 2;
pub const DEFAULT_OUTPUT_LEN: usize = 32;

/// Hashing configuration (runtime, fully resolved).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
	pub memory_kib: u32,
	pub iterations: u32,
	pub parallelism: u32,
	pub output_len: usize,
}

impl Default for HashingConfig {
	fn default() -> Self {
		HashingConfigLayer::default().finalize()
	}
}

impl HashingConfig {
	/// Check the bounds Argon2 enforces.
	pub fn validate(&self) -> Result<(), String> {
		if self.iterations < 1 {
			return Err("hashing.iterations must be at least 1".to_string());
		}
		if !(1..=0x00ff_ffff).contains(&self.parallelism) {
			return Err("hashing.parallelism must be between 1 and 16777215".to_string());
		}
		if self.memory_kib < 8 * self.parallelism {
			return Err(format!(
				"hashing.memory_kib must be at least 8 * parallelism ({})",
				8 * self.parallelism
			));
		}
		if !(4..=1024).contains(&self.output_len) {
			return Err("hashing.output_len must be between 4 and 1024".to_string());
		}
		Ok(())
	}
}

/// Hashing configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashingConfigLayer {
	#[serde(default)]
	pub memory_kib: Option<u32>,
	#[serde(default)]
	pub iterations: Option<u32>,
	#[serde(default)]
	pub parallelism: Option<u32>,
	#[serde(default)]
	pub output_len: Option<usize>,
}

impl HashingConfigLayer {
	pub fn merge(&mut self, other: HashingConfigLayer) {
		if other.memory_kib.is_some() {
			self.memory_kib = other.memory_kib;
		}
		if other.iterations.is_some() {
			self.iterations = other.iterations;
		}
		if other.parallelism.is_some() {
			self.parallelism = other.parallelism;
		}
		if other.output_len.is_some() {
			self.output_len = other.output_len;
		}
	}

	pub fn finalize(self) -> HashingConfig {
		HashingConfig {
			memory_kib: self.memory_kib.unwrap_or(DEFAULT_MEMORY_KIB),
			iterations: self.iterations.unwrap_or(DEFAULT_ITERATIONS),
			parallelism: self.parallelism.unwrap_or(DEFAULT_PARALLELISM),
			output_len: self.output_len.unwrap_or(DEFAULT_OUTPUT_LEN),
		}
	}
}
