// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Token extraction and session resolution for authenticated routes.
//!
//! [`auth_layer`] runs the two mandatory stages of the enforcement chain: it
//! reads the session token from the configured header and resolves it to an
//! [`Identity`]. On success the identity, the token and the request context
//! are placed in the request extensions for handlers and route layers.
//!
//! # Security Properties
//!
//! - A request without a token is rejected with 401 `MISSING_CREDENTIAL`
//! - An unknown or expired session is rejected with 401 `UNAUTHENTICATED`
//! - Tokens are never logged

use axum::{
	extract::{FromRequestParts, Request, State},
	http::request::Parts,
	middleware::Next,
	response::{IntoResponse, Response},
};
use hookgate_server_auth::{
	extract_session_token, resolve_identity, AuthContext, AuthError, Identity, RequestContext,
	SessionToken,
};

use crate::{api::AppState, error::ApiError};

/// Authenticate the request or reject it.
pub async fn auth_layer(
	State(state): State<AppState>,
	mut request: Request,
	next: Next,
) -> Response {
	let ctx = state.request_context();

	let Some(token) = extract_session_token(request.headers(), &state.auth_config.session_header)
	else {
		tracing::debug!(
			header = %state.auth_config.session_header,
			"no session credential presented"
		);
		return ApiError(AuthError::MissingCredential).into_response();
	};

	let identity = match resolve_identity(&state.sessions, &ctx, &token).await {
		Ok(identity) => identity,
		Err(e) => return ApiError(e).into_response(),
	};

	let extensions = request.extensions_mut();
	extensions.insert(identity);
	extensions.insert(AuthContext::authenticated(identity));
	extensions.insert(token);
	extensions.insert(ctx);

	next.run(request).await
}

/// Extractor for the authenticated [`Identity`].
///
/// Rejects with 401 when the route is not behind [`auth_layer`].
pub struct RequireAuth(pub Identity);

impl<S> FromRequestParts<S> for RequireAuth
where
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let auth = parts
			.extensions
			.get::<AuthContext>()
			.cloned()
			.unwrap_or_else(AuthContext::unauthenticated);
		auth
			.require_identity()
			.map(|identity| RequireAuth(*identity))
			.map_err(ApiError)
	}
}

/// Extractor for the token the request authenticated with.
pub struct PresentedToken(pub SessionToken);

impl<S> FromRequestParts<S> for PresentedToken
where
	S: Send + Sync,
{
	type Rejection = ApiError;

	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts
			.extensions
			.get::<SessionToken>()
			.cloned()
			.map(PresentedToken)
			.ok_or(ApiError(AuthError::MissingCredential))
	}
}

/// Extractor for the request's [`RequestContext`].
///
/// Authenticated routes reuse the context created by [`auth_layer`] so the
/// whole request shares one deadline; public routes get a fresh one.
pub struct Ctx(pub RequestContext);

impl FromRequestParts<AppState> for Ctx {
	type Rejection = std::convert::Infallible;

	async fn from_request_parts(
		parts: &mut Parts,
		state: &AppState,
	) -> Result<Self, Self::Rejection> {
		Ok(Ctx(parts
			.extensions
			.get::<RequestContext>()
			.copied()
			.unwrap_or_else(|| state.request_context())))
	}
}
