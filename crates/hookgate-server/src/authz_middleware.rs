// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Route-level authorization layers.
//!
//! [`RequireAccess`] is the per-route stage of the enforcement chain. It runs
//! after [`auth_layer`](crate::auth_middleware::auth_layer) and checks the
//! resolved [`Identity`] against one rule:
//!
//! - [`RequireAccess::permission`] - the role must grant a permission
//! - [`RequireAccess::admin`] - the role must be admin
//! - [`RequireAccess::ownership_or_admin`] - the identity must own the user
//!   named by a path parameter, or be admin
//!
//! A request with no identity is rejected with 401; a failed rule with 403.
//!
//! # Example
//!
//! ```ignore
//! Router::new()
//!     .route("/api/users/{id}", get(get_user))
//!     .route_layer(RequireAccess::ownership_or_admin(policy, "id"));
//! ```

use std::task::{Context, Poll};

use axum::{
	extract::{FromRequestParts, RawPathParams, Request},
	http::request::Parts,
	response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use hookgate_server_auth::{
	AccessPolicy, AccessRequirement, AuthError, Identity, Permission, UserId,
};
use tower::{Layer, Service};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
enum Rule {
	Permission(Permission),
	Admin,
	OwnershipOrAdmin { param: &'static str },
}

/// Route layer enforcing one access rule.
#[derive(Clone)]
pub struct RequireAccess {
	policy: AccessPolicy,
	rule: Rule,
}

impl RequireAccess {
	pub fn permission(policy: AccessPolicy, permission: Permission) -> Self {
		Self {
			policy,
			rule: Rule::Permission(permission),
		}
	}

	pub fn admin(policy: AccessPolicy) -> Self {
		Self {
			policy,
			rule: Rule::Admin,
		}
	}

	/// Require that the identity owns the user whose id is in path parameter
	/// `param`, or is admin.
	///
	/// A missing or malformed parameter can only be satisfied by an admin.
	pub fn ownership_or_admin(policy: AccessPolicy, param: &'static str) -> Self {
		Self {
			policy,
			rule: Rule::OwnershipOrAdmin { param },
		}
	}
}

impl<S> Layer<S> for RequireAccess {
	type Service = RequireAccessService<S>;

	fn layer(&self, inner: S) -> Self::Service {
		RequireAccessService {
			inner,
			policy: self.policy.clone(),
			rule: self.rule,
		}
	}
}

/// Service wrapper for [`RequireAccess`].
#[derive(Clone)]
pub struct RequireAccessService<S> {
	inner: S,
	policy: AccessPolicy,
	rule: Rule,
}

impl<S> Service<Request> for RequireAccessService<S>
where
	S: Service<Request, Response = Response> + Clone + Send + 'static,
	S::Future: Send,
	S::Error: Send + 'static,
{
	type Response = Response;
	type Error = S::Error;
	type Future = BoxFuture<'static, Result<Response, S::Error>>;

	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
		self.inner.poll_ready(cx)
	}

	fn call(&mut self, req: Request) -> Self::Future {
		// Take the service that was driven to readiness; leave a clone behind.
		let clone = self.inner.clone();
		let mut inner = std::mem::replace(&mut self.inner, clone);
		let policy = self.policy.clone();
		let rule = self.rule;

		Box::pin(async move {
			let (mut parts, body) = req.into_parts();

			let Some(identity) = parts.extensions.get::<Identity>().copied() else {
				tracing::debug!(rule = ?rule, "access denied: not authenticated");
				return Ok(ApiError(AuthError::Unauthenticated).into_response());
			};

			let requirement = requirement_for(rule, &mut parts).await;
			if let Err(e) = requirement.check(&policy, &identity) {
				tracing::info!(
					user_id = %identity.user_id,
					role = %identity.role,
					rule = ?rule,
					"access denied"
				);
				return Ok(ApiError(e).into_response());
			}

			tracing::debug!(user_id = %identity.user_id, rule = ?rule, "access allowed");
			inner.call(Request::from_parts(parts, body)).await
		})
	}
}

async fn requirement_for(rule: Rule, parts: &mut Parts) -> AccessRequirement {
	match rule {
		Rule::Permission(permission) => AccessRequirement::Permission(permission),
		Rule::Admin => AccessRequirement::Admin,
		Rule::OwnershipOrAdmin { param } => match owner_from_path(parts, param).await {
			Some(owner) => AccessRequirement::OwnershipOrAdmin(owner),
			None => AccessRequirement::Admin,
		},
	}
}

async fn owner_from_path(parts: &mut Parts, param: &str) -> Option<UserId> {
	let params = RawPathParams::from_request_parts(parts, &()).await.ok()?;
	params
		.iter()
		.find(|(name, _)| *name == param)
		.and_then(|(_, value)| value.parse().ok())
}
