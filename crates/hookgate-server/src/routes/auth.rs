// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Login, logout, refresh and current-user handlers.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use hookgate_server_auth::{LoginRequest, LoginResponse, UserProfile};
use serde::{Deserialize, Serialize};

use crate::{
	api::AppState,
	auth_middleware::{Ctx, PresentedToken, RequireAuth},
	error::ApiError,
};

/// Response for a refreshed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
	pub expires_at: DateTime<Utc>,
}

/// POST /auth/login - Exchange email and password for a session token.
pub async fn login(
	State(state): State<AppState>,
	Ctx(ctx): Ctx,
	Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
	let response = state.auth_service.login(&ctx, request).await?;
	Ok(Json(response))
}

/// POST /auth/logout - Revoke the session the request authenticated with.
pub async fn logout(
	State(state): State<AppState>,
	Ctx(ctx): Ctx,
	RequireAuth(identity): RequireAuth,
	PresentedToken(token): PresentedToken,
) -> Result<StatusCode, ApiError> {
	state.auth_service.logout(&ctx, &token).await?;
	tracing::info!(user_id = %identity.user_id, "logged out");
	Ok(StatusCode::NO_CONTENT)
}

/// POST /auth/refresh - Extend the current session.
pub async fn refresh(
	State(state): State<AppState>,
	Ctx(ctx): Ctx,
	PresentedToken(token): PresentedToken,
) -> Result<Json<RefreshResponse>, ApiError> {
	let session = state.auth_service.refresh(&ctx, &token).await?;
	Ok(Json(RefreshResponse {
		expires_at: session.expires_at,
	}))
}

/// GET /auth/me - The live profile of the authenticated user.
pub async fn me(
	State(state): State<AppState>,
	Ctx(ctx): Ctx,
	RequireAuth(identity): RequireAuth,
) -> Result<Json<UserProfile>, ApiError> {
	let profile = state.auth_service.current_user(&ctx, &identity).await?;
	Ok(Json(profile))
}
