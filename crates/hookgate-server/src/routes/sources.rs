// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Webhook source auth-config handlers.

use axum::Json;
use hookgate_server_auth::{source_auth, AuthType};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{auth_middleware::RequireAuth, error::ApiError};

/// Request body for auth-config validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateAuthConfigRequest {
	pub auth_type: String,
	/// Missing and `null` are treated as an empty object.
	#[serde(default)]
	pub auth_config: Value,
}

/// A validated, canonicalized auth config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateAuthConfigResponse {
	pub auth_type: AuthType,
	pub auth_config: Value,
}

/// POST /api/sources/auth-config/validate - Check and normalize a source's
/// auth config. Requires `manage:sources`.
pub async fn validate_auth_config(
	RequireAuth(identity): RequireAuth,
	Json(request): Json<ValidateAuthConfigRequest>,
) -> Result<Json<ValidateAuthConfigResponse>, ApiError> {
	let config = source_auth::validate(&request.auth_type, &request.auth_config)?;
	tracing::debug!(
		user_id = %identity.user_id,
		auth_type = %config.auth_type(),
		"auth config validated"
	);
	Ok(Json(ValidateAuthConfigResponse {
		auth_type: config.auth_type(),
		auth_config: config.to_value(),
	}))
}
