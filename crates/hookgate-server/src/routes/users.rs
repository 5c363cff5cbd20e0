// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	extract::{Path, State},
	Json,
};
use hookgate_server_auth::{UpdateProfileRequest, UserId, UserProfile, ValidationErrors};

use crate::{api::AppState, auth_middleware::Ctx, error::ApiError};

/// GET /api/users/{id} - A user's profile. Owner or admin only.
pub async fn get_user(
	State(state): State<AppState>,
	Ctx(ctx): Ctx,
	Path(id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
	let user_id = parse_user_id(&id)?;
	let profile = state.auth_service.user_profile(&ctx, &user_id).await?;
	Ok(Json(profile))
}

/// PUT /api/users/{id} - Change a user's names. Needs `write` plus owner or admin.
pub async fn update_user(
	State(state): State<AppState>,
	Ctx(ctx): Ctx,
	Path(id): Path<String>,
	Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, ApiError> {
	let user_id = parse_user_id(&id)?;
	let profile = state
		.auth_service
		.update_profile(&ctx, &user_id, request)
		.await?;
	Ok(Json(profile))
}

fn parse_user_id(raw: &str) -> Result<UserId, ValidationErrors> {
	raw
		.parse()
		.map_err(|_| ValidationErrors::single("id", "must be a valid UUID"))
}
