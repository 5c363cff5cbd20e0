// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Loading secrets from the environment with `*_FILE` support.
//!
//! For a variable `NAME`, `NAME_FILE` pointing at a file takes priority over
//! `NAME` itself, so secrets can be mounted as files (Docker/Kubernetes
//! secrets) instead of living in the process environment.

use std::path::PathBuf;

use hookgate_common_secret::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read {var} from {path}: {source}")]
	FileRead {
		var: String,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("{var} points at an empty file: {path}")]
	EmptyFile { var: String, path: PathBuf },
}

/// Load a secret from `NAME_FILE` or `NAME`, reading variables via `lookup`.
///
/// Trailing newlines in files are stripped. Returns `Ok(None)` when neither
/// variable is set or `NAME` is empty.
pub(crate) fn load_secret(
	name: &str,
	lookup: impl Fn(&str) -> Option<String>,
) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{name}_FILE");
	if let Some(path) = lookup(&file_var).filter(|p| !p.is_empty()) {
		let path = PathBuf::from(path);
		let content = std::fs::read_to_string(&path).map_err(|source| SecretEnvError::FileRead {
			var: file_var.clone(),
			path: path.clone(),
			source,
		})?;
		let value = content.trim_end_matches(['\n', '\r']).to_string();
		if value.is_empty() {
			return Err(SecretEnvError::EmptyFile {
				var: file_var,
				path,
			});
		}
		return Ok(Some(SecretString::new(value)));
	}

	Ok(lookup(name)
		.filter(|v| !v.is_empty())
		.map(SecretString::new))
}
