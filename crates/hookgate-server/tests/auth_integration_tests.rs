// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Integration tests for the HTTP surface.
//!
//! Tests cover:
//! - Login, current user, refresh and logout
//! - Token extraction from the configured header
//! - Permission, admin and ownership rules on guarded routes
//! - Profile edits gated on `write` plus ownership
//! - First-admin setup
//! - Source auth-config validation over HTTP

use std::sync::Arc;

use axum::{
	body::Body,
	http::{header::AUTHORIZATION, Request, StatusCode},
	Router,
};
use chrono::Utc;
use hookgate_server::{create_app_state, create_router, AppState, ErrorResponse, ServerConfig};
use hookgate_server_auth::{
	MemoryStore, MemoryUserDirectory, Role, User, UserId, UserProfile, MAX_SESSION_TTL,
};
use hookgate_server_config::{HashingConfig, MAX_SESSION_TTL_SECS};
use serde_json::{json, Value};
use tower::ServiceExt;

const PASSWORD: &str = "Str0ng!Passw0rd";

struct TestApp {
	router: Router,
	state: AppState,
	users: Arc<MemoryUserDirectory>,
}

fn test_config() -> ServerConfig {
	ServerConfig {
		hashing: HashingConfig {
			memory_kib: 1024,
			iterations: 1,
			parallelism: 1,
			output_len: 32,
		},
		..Default::default()
	}
}

fn setup_test_app_with_config(config: ServerConfig) -> TestApp {
	let users = Arc::new(MemoryUserDirectory::new());
	let state = create_app_state(&config, Arc::new(MemoryStore::new()), users.clone()).unwrap();
	TestApp {
		router: create_router(state.clone()),
		state,
		users,
	}
}

fn setup_test_app() -> TestApp {
	setup_test_app_with_config(test_config())
}

impl TestApp {
	async fn add_user(&self, email: &str, role: Role) -> UserId {
		let now = Utc::now();
		let user = User {
			id: UserId::generate(),
			email: email.to_string(),
			first_name: "Test".to_string(),
			last_name: "User".to_string(),
			role,
			password_hash: self.state.auth_service.hasher().hash(PASSWORD).unwrap(),
			is_active: true,
			created_at: now,
			updated_at: now,
		};
		let id = user.id;
		self.users.insert(user).await;
		id
	}

	async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
		let response = self.router.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		let body = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, body)
	}

	async fn login(&self, email: &str, password: &str) -> (StatusCode, Value) {
		self
			.send(post_json(
				"/auth/login",
				json!({ "email": email, "password": password }),
				None,
			))
			.await
	}

	async fn token_for(&self, email: &str) -> String {
		let (status, body) = self.login(email, PASSWORD).await;
		assert_eq!(status, StatusCode::OK, "login failed: {body}");
		body["session_token"].as_str().unwrap().to_string()
	}
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
	let mut builder = Request::builder().uri(uri);
	if let Some(token) = token {
		builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
	}
	builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
	let mut builder = Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json");
	if let Some(token) = token {
		builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
	}
	builder.body(Body::from(body.to_string())).unwrap()
}

fn put_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
	let mut builder = Request::builder()
		.method("PUT")
		.uri(uri)
		.header("content-type", "application/json");
	if let Some(token) = token {
		builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
	}
	builder.body(Body::from(body.to_string())).unwrap()
}

fn error_code(body: &Value) -> String {
	let error: ErrorResponse = serde_json::from_value(body.clone()).unwrap();
	error.error
}

// ============================================================================
// Public routes
// ============================================================================

#[tokio::test]
async fn test_health_is_public() {
	let app = setup_test_app();
	let (status, body) = app.send(get("/health", None)).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["status"], "healthy");
	assert_eq!(body["session_store"], "memory");
}

#[test]
fn test_config_ttl_bound_matches_session_bound() {
	assert_eq!(MAX_SESSION_TTL.as_secs(), MAX_SESSION_TTL_SECS);
}

// ============================================================================
// Login / session lifecycle
// ============================================================================

#[tokio::test]
async fn test_login_me_logout_me() {
	let app = setup_test_app();
	let id = app.add_user("dev@example.com", Role::Developer).await;

	let (status, body) = app.login("DEV@example.com ", PASSWORD).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["user"]["id"], id.to_string());
	assert_eq!(body["user"]["role"], "developer");
	assert!(body["user"].get("password_hash").is_none());
	assert!(body["expires_at"].is_string());
	let token = body["session_token"].as_str().unwrap().to_string();
	assert_eq!(token.len(), 64);

	let (status, body) = app.send(get("/auth/me", Some(&token))).await;
	assert_eq!(status, StatusCode::OK);
	let profile: UserProfile = serde_json::from_value(body).unwrap();
	assert_eq!(profile.id, id);
	assert_eq!(profile.email, "dev@example.com");

	let (status, _) = app
		.send(post_json("/auth/logout", json!({}), Some(&token)))
		.await;
	assert_eq!(status, StatusCode::NO_CONTENT);

	let (status, body) = app.send(get("/auth/me", Some(&token))).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(error_code(&body), "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
	let app = setup_test_app();
	app.add_user("dev@example.com", Role::Developer).await;

	let (wrong_status, wrong_body) = app.login("dev@example.com", "Wr0ng!Password").await;
	let (unknown_status, unknown_body) = app.login("nobody@example.com", PASSWORD).await;

	assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
	assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
	assert_eq!(wrong_body, unknown_body);
	assert_eq!(error_code(&wrong_body), "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_inactive_account_cannot_login() {
	let app = setup_test_app();
	let id = app.add_user("gone@example.com", Role::Viewer).await;
	app.users.set_active(&id, false).await;

	let (status, body) = app.login("gone@example.com", PASSWORD).await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(error_code(&body), "ACCOUNT_INACTIVE");

	let (status, body) = app.login("gone@example.com", "Wr0ng!Password").await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(error_code(&body), "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_deactivated_user_loses_me() {
	let app = setup_test_app();
	let id = app.add_user("dev@example.com", Role::Developer).await;
	let token = app.token_for("dev@example.com").await;

	app.users.set_active(&id, false).await;

	let (status, body) = app.send(get("/auth/me", Some(&token))).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(error_code(&body), "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_refresh_returns_expiry() {
	let app = setup_test_app();
	app.add_user("dev@example.com", Role::Developer).await;
	let (_, login) = app.login("dev@example.com", PASSWORD).await;
	let token = login["session_token"].as_str().unwrap();

	let (status, body) = app
		.send(post_json("/auth/refresh", json!({}), Some(token)))
		.await;
	assert_eq!(status, StatusCode::OK);

	let before: chrono::DateTime<Utc> =
		serde_json::from_value(login["expires_at"].clone()).unwrap();
	let after: chrono::DateTime<Utc> = serde_json::from_value(body["expires_at"].clone()).unwrap();
	assert!(after >= before);
}

// ============================================================================
// Token extraction
// ============================================================================

#[tokio::test]
async fn test_missing_header_is_401() {
	let app = setup_test_app();
	let (status, body) = app.send(get("/auth/me", None)).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(error_code(&body), "MISSING_CREDENTIAL");
}

#[tokio::test]
async fn test_bare_bearer_scheme_is_missing_credential() {
	let app = setup_test_app();
	let request = Request::builder()
		.uri("/auth/me")
		.header(AUTHORIZATION, "Bearer ")
		.body(Body::empty())
		.unwrap();
	let (status, body) = app.send(request).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(error_code(&body), "MISSING_CREDENTIAL");
}

#[tokio::test]
async fn test_unknown_token_is_401() {
	let app = setup_test_app();
	let (status, body) = app.send(get("/auth/me", Some("deadbeef"))).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(error_code(&body), "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_raw_token_is_accepted() {
	let app = setup_test_app();
	app.add_user("dev@example.com", Role::Developer).await;
	let token = app.token_for("dev@example.com").await;

	let request = Request::builder()
		.uri("/auth/me")
		.header(AUTHORIZATION, token)
		.body(Body::empty())
		.unwrap();
	let (status, _) = app.send(request).await;
	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_custom_session_header() {
	let mut config = test_config();
	config.auth.session_header = "X-Session-Token".to_string();
	let app = setup_test_app_with_config(config);
	app.add_user("dev@example.com", Role::Developer).await;
	let token = app.token_for("dev@example.com").await;

	// Authorization is no longer consulted.
	let (status, _) = app.send(get("/auth/me", Some(&token))).await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);

	let request = Request::builder()
		.uri("/auth/me")
		.header("x-session-token", token)
		.body(Body::empty())
		.unwrap();
	let (status, _) = app.send(request).await;
	assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Route-level authorization
// ============================================================================

#[tokio::test]
async fn test_viewer_forbidden_developer_allowed_on_source_validation() {
	let app = setup_test_app();
	app.add_user("viewer@example.com", Role::Viewer).await;
	app.add_user("dev@example.com", Role::Developer).await;
	let viewer = app.token_for("viewer@example.com").await;
	let developer = app.token_for("dev@example.com").await;
	let payload = json!({ "auth_type": "bearer", "auth_config": { "token": "abc" } });

	let (status, body) = app
		.send(post_json(
			"/api/sources/auth-config/validate",
			payload.clone(),
			Some(&viewer),
		))
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(error_code(&body), "FORBIDDEN");

	let (status, body) = app
		.send(post_json(
			"/api/sources/auth-config/validate",
			payload,
			Some(&developer),
		))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["auth_type"], "bearer");
	assert_eq!(body["auth_config"], json!({ "token": "abc" }));
}

#[tokio::test]
async fn test_owner_or_admin_on_user_profile() {
	let app = setup_test_app();
	let viewer_id = app.add_user("viewer@example.com", Role::Viewer).await;
	let dev_id = app.add_user("dev@example.com", Role::Developer).await;
	app.add_user("admin@example.com", Role::Admin).await;
	let viewer = app.token_for("viewer@example.com").await;
	let admin = app.token_for("admin@example.com").await;

	let (status, body) = app
		.send(get(&format!("/api/users/{viewer_id}"), Some(&viewer)))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["email"], "viewer@example.com");

	let (status, _) = app
		.send(get(&format!("/api/users/{dev_id}"), Some(&viewer)))
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, body) = app
		.send(get(&format!("/api/users/{dev_id}"), Some(&admin)))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["email"], "dev@example.com");

	let (status, body) = app
		.send(get(
			&format!("/api/users/{}", UserId::generate()),
			Some(&admin),
		))
		.await;
	assert_eq!(status, StatusCode::NOT_FOUND);
	assert_eq!(error_code(&body), "USER_NOT_FOUND");
}

#[tokio::test]
async fn test_profile_update_needs_write_and_ownership() {
	let app = setup_test_app();
	let viewer_id = app.add_user("viewer@example.com", Role::Viewer).await;
	let dev_id = app.add_user("dev@example.com", Role::Developer).await;
	let other_dev_id = app.add_user("other@example.com", Role::Developer).await;
	app.add_user("admin@example.com", Role::Admin).await;
	let viewer = app.token_for("viewer@example.com").await;
	let developer = app.token_for("dev@example.com").await;
	let admin = app.token_for("admin@example.com").await;
	let names = json!({ "first_name": "Grace", "last_name": "Hopper" });

	// Viewers lack `write`, even on their own profile.
	let (status, body) = app
		.send(put_json(
			&format!("/api/users/{viewer_id}"),
			names.clone(),
			Some(&viewer),
		))
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);
	assert_eq!(error_code(&body), "FORBIDDEN");

	// `write` alone does not reach someone else's profile.
	let (status, _) = app
		.send(put_json(
			&format!("/api/users/{other_dev_id}"),
			names.clone(),
			Some(&developer),
		))
		.await;
	assert_eq!(status, StatusCode::FORBIDDEN);

	let (status, body) = app
		.send(put_json(
			&format!("/api/users/{dev_id}"),
			names.clone(),
			Some(&developer),
		))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["first_name"], "Grace");
	assert_eq!(body["last_name"], "Hopper");

	let (status, body) = app
		.send(put_json(
			&format!("/api/users/{other_dev_id}"),
			json!({ "first_name": "Ada", "last_name": "Lovelace" }),
			Some(&admin),
		))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["first_name"], "Ada");

	let (status, body) = app
		.send(get(&format!("/api/users/{other_dev_id}"), Some(&admin)))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["last_name"], "Lovelace");
}

#[tokio::test]
async fn test_profile_update_rejects_blank_names() {
	let app = setup_test_app();
	let dev_id = app.add_user("dev@example.com", Role::Developer).await;
	let developer = app.token_for("dev@example.com").await;

	let (status, body) = app
		.send(put_json(
			&format!("/api/users/{dev_id}"),
			json!({ "first_name": " ", "last_name": "Hopper" }),
			Some(&developer),
		))
		.await;
	assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
	assert_eq!(body["details"]["first_name"], "is required");
}

#[tokio::test]
async fn test_unknown_path_is_404_without_token() {
	let app = setup_test_app();
	let (status, _) = app.send(get("/no/such/route", None)).await;
	assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_guarded_route_without_token_is_401() {
	let app = setup_test_app();
	let (status, body) = app
		.send(post_json(
			"/api/sources/auth-config/validate",
			json!({ "auth_type": "none" }),
			None,
		))
		.await;
	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(error_code(&body), "MISSING_CREDENTIAL");
}

// ============================================================================
// Source auth-config validation
// ============================================================================

#[tokio::test]
async fn test_source_validation_reports_every_missing_field() {
	let app = setup_test_app();
	app.add_user("dev@example.com", Role::Developer).await;
	let token = app.token_for("dev@example.com").await;

	let (status, body) = app
		.send(post_json(
			"/api/sources/auth-config/validate",
			json!({ "auth_type": "basic", "auth_config": {} }),
			Some(&token),
		))
		.await;
	assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
	assert_eq!(error_code(&body), "VALIDATION_FAILED");
	assert!(body["details"]["username"].is_string());
	assert!(body["details"]["password"].is_string());
}

#[tokio::test]
async fn test_source_validation_none_discards_config() {
	let app = setup_test_app();
	app.add_user("dev@example.com", Role::Developer).await;
	let token = app.token_for("dev@example.com").await;

	let (status, body) = app
		.send(post_json(
			"/api/sources/auth-config/validate",
			json!({ "auth_type": "none", "auth_config": { "x": 1 } }),
			Some(&token),
		))
		.await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["auth_config"], json!({}));
}

#[tokio::test]
async fn test_source_validation_rejects_unknown_algorithm() {
	let app = setup_test_app();
	app.add_user("dev@example.com", Role::Developer).await;
	let token = app.token_for("dev@example.com").await;

	let (status, body) = app
		.send(post_json(
			"/api/sources/auth-config/validate",
			json!({
				"auth_type": "signature",
				"auth_config": {
					"secret": "s",
					"algorithm": "sha3",
					"encoding": "hex",
					"header": "X-Sig"
				}
			}),
			Some(&token),
		))
		.await;
	assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
	let details = body["details"].as_object().unwrap();
	assert_eq!(details.len(), 1);
	assert!(details.contains_key("algorithm"));
}

// ============================================================================
// First-admin setup
// ============================================================================

#[tokio::test]
async fn test_setup_admin_only_once() {
	let app = setup_test_app();
	let request = json!({
		"email": "Root@Example.com",
		"password": PASSWORD,
		"first_name": "Root",
		"last_name": "Admin"
	});

	let (status, body) = app
		.send(post_json("/setup/admin", request.clone(), None))
		.await;
	assert_eq!(status, StatusCode::CREATED);
	assert_eq!(body["role"], "admin");
	assert_eq!(body["email"], "root@example.com");

	let (status, body) = app.send(post_json("/setup/admin", request, None)).await;
	assert_eq!(status, StatusCode::CONFLICT);
	assert_eq!(error_code(&body), "SETUP_ALREADY_COMPLETED");

	let token = app.token_for("root@example.com").await;
	let (status, body) = app.send(get("/auth/me", Some(&token))).await;
	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["role"], "admin");
}

#[tokio::test]
async fn test_setup_admin_rejects_weak_password() {
	let app = setup_test_app();
	let (status, body) = app
		.send(post_json(
			"/setup/admin",
			json!({
				"email": "root@example.com",
				"password": "short",
				"first_name": "Root",
				"last_name": "Admin"
			}),
			None,
		))
		.await;
	assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
	assert!(body["details"]["password"].is_string());
}
