// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, http::StatusCode, Json};
use hookgate_server_auth::{SetupAdminRequest, UserProfile};

use crate::{api::AppState, auth_middleware::Ctx, error::ApiError};

/// POST /setup/admin - Create the first administrator.
///
/// Only succeeds while no users exist; afterwards returns 409.
pub async fn setup_admin(
	State(state): State<AppState>,
	Ctx(ctx): Ctx,
	Json(request): Json<SetupAdminRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
	let profile = state.auth_service.setup_admin(&ctx, request).await?;
	Ok((StatusCode::CREATED, Json(profile)))
}
