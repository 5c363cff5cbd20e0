// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router construction.

use std::sync::Arc;
use std::time::Duration;

use axum::{
	middleware::from_fn_with_state,
	routing::{get, post, put},
	Router,
};
use hookgate_server_auth::{
	AccessPolicy, AuthConfig, AuthService, CredentialHasher, HashParams, KeyValueStore,
	MemoryStore, Permission, RequestContext, SessionAuthority, SessionConfig, UserDirectory,
};
use hookgate_server_config::{ServerConfig, StoreBackend, StoreConfig};

use crate::{
	auth_middleware::auth_layer, authz_middleware::RequireAccess, error::ServerError, routes,
};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
	pub auth_service: Arc<AuthService>,
	pub sessions: SessionAuthority,
	pub policy: AccessPolicy,
	pub auth_config: AuthConfig,
	/// Per-request deadline; `None` means unbounded.
	pub request_timeout: Option<Duration>,
	pub store_backend: &'static str,
}

impl AppState {
	/// A fresh context for one request.
	pub fn request_context(&self) -> RequestContext {
		match self.request_timeout {
			Some(timeout) => RequestContext::with_timeout(timeout),
			None => RequestContext::background(),
		}
	}
}

/// Wire the auth components together from configuration.
pub fn create_app_state(
	config: &ServerConfig,
	store: Arc<dyn KeyValueStore>,
	users: Arc<dyn UserDirectory>,
) -> Result<AppState, ServerError> {
	let session_header = http::HeaderName::from_bytes(config.auth.session_header.as_bytes())?;

	let params = HashParams::new(
		config.hashing.memory_kib,
		config.hashing.iterations,
		config.hashing.parallelism,
		config.hashing.output_len,
	);
	params.validate().map_err(ServerError::Hashing)?;

	let store_backend = store.backend_name();
	let sessions = SessionAuthority::new(
		store,
		SessionConfig {
			ttl: config.auth.session_ttl(),
			sliding: config.auth.sliding_sessions,
		},
	);
	let auth_service = AuthService::new(users, sessions.clone(), CredentialHasher::new(params));

	Ok(AppState {
		auth_service: Arc::new(auth_service),
		sessions,
		policy: AccessPolicy::default(),
		auth_config: AuthConfig::new().with_session_header(session_header),
		request_timeout: config.http.request_timeout(),
		store_backend,
	})
}

/// Open the configured session store.
///
/// A Redis store is pinged once so a bad URL fails at startup.
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, ServerError> {
	match config.backend {
		StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
		StoreBackend::Redis => open_redis(config).await,
	}
}

#[cfg(feature = "redis")]
async fn open_redis(config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, ServerError> {
	use hookgate_server_auth::{RedisStore, StoreError};

	let url = config
		.redis_url
		.as_ref()
		.ok_or_else(|| StoreError::Connection("no redis url configured".to_string()))?;
	let store = RedisStore::new(url.expose())?;
	store.ping().await?;
	Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn open_redis(_config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, ServerError> {
	Err(ServerError::BackendUnavailable("redis".to_string()))
}

/// Build the HTTP router.
///
/// Public routes skip the enforcement chain. Everything else runs token
/// extraction and session resolution, then any per-route rule. Unmatched
/// paths fall through to a plain 404 without authentication.
pub fn create_router(state: AppState) -> Router {
	let policy = state.policy.clone();

	let public = Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/auth/login", post(routes::auth::login))
		.route("/setup/admin", post(routes::setup::setup_admin));

	// Reading a profile needs ownership; editing it also needs `write`.
	let update_user = put(routes::users::update_user)
		.route_layer(RequireAccess::permission(policy.clone(), Permission::Write));
	let users = Router::new()
		.route(
			"/api/users/{id}",
			get(routes::users::get_user).merge(update_user),
		)
		.route_layer(RequireAccess::ownership_or_admin(policy.clone(), "id"));

	let sources = Router::new()
		.route(
			"/api/sources/auth-config/validate",
			post(routes::sources::validate_auth_config),
		)
		.route_layer(RequireAccess::permission(policy, Permission::ManageSources));

	let authed = Router::new()
		.route("/auth/logout", post(routes::auth::logout))
		.route("/auth/refresh", post(routes::auth::refresh))
		.route("/auth/me", get(routes::auth::me))
		.merge(users)
		.merge(sources)
		.route_layer(from_fn_with_state(state.clone(), auth_layer));

	Router::new().merge(public).merge(authed).with_state(state)
}
