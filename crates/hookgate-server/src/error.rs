// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP error mapping.
//!
//! [`ApiError`] turns an [`AuthError`] into a JSON [`ErrorResponse`] using the
//! error's status and code. Server-side failures (5xx) are logged in full and
//! returned with only a generic message.

use std::collections::BTreeMap;

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use hookgate_server_auth::{AuthError, StoreError, ValidationErrors};
use hookgate_server_config::ConfigError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body of every error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
	/// Field-level messages for validation failures.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub details: Option<BTreeMap<String, String>>,
}

/// An [`AuthError`] on its way to the client.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
	fn from(err: AuthError) -> Self {
		ApiError(err)
	}
}

impl From<ValidationErrors> for ApiError {
	fn from(errors: ValidationErrors) -> Self {
		ApiError(AuthError::Validation(errors))
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let err = self.0;
		let status =
			StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		let message = if err.is_server_error() {
			tracing::error!(error = %err, code = err.error_code(), "request failed");
			status
				.canonical_reason()
				.unwrap_or("Internal Server Error")
				.to_string()
		} else {
			err.to_string()
		};

		let details = match &err {
			AuthError::Validation(errors) => Some(errors.fields().clone()),
			_ => None,
		};

		(
			status,
			Json(ErrorResponse {
				error: err.error_code().to_string(),
				message,
				details,
			}),
		)
			.into_response()
	}
}

/// Startup failures of the server binary.
#[derive(Debug, Error)]
pub enum ServerError {
	#[error("configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("invalid session header: {0}")]
	InvalidHeader(#[from] http::header::InvalidHeaderName),

	#[error("invalid hashing parameters: {0}")]
	Hashing(AuthError),

	#[error("session store error: {0}")]
	Store(#[from] StoreError),

	#[error("store backend '{0}' is not available in this build")]
	BackendUnavailable(String),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}
