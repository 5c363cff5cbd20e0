// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Login, logout, session refresh and first-admin setup.
//!
//! [`AuthService`] composes the credential hasher, the session authority and a
//! [`UserDirectory`]. It is the only place that reads password hashes.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use hookgate_common_secret::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::context::RequestContext;
use crate::error::{AuthError, ValidationErrors};
use crate::middleware::Identity;
use crate::password::{validate_password_strength, CredentialHasher};
use crate::session::{Session, SessionAuthority, SessionToken};
use crate::types::{Role, UserId};
use crate::user::{normalize_email, NewUser, ProfileUpdate, UserDirectory, UserProfile};

/// Credentials submitted at login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
	pub email: String,
	pub password: SecretString,
}

/// Successful login result.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
	pub user: UserProfile,
	/// The bearer token; returned once, at login.
	pub session_token: SessionToken,
	pub expires_at: DateTime<Utc>,
}

/// First administrator account.
#[derive(Debug, Clone, Deserialize)]
pub struct SetupAdminRequest {
	pub email: String,
	pub password: SecretString,
	pub first_name: String,
	pub last_name: String,
}

impl SetupAdminRequest {
	fn validate(&self) -> Result<(), ValidationErrors> {
		let mut errors = ValidationErrors::new();

		let email = normalize_email(&self.email);
		if email.is_empty() {
			errors.add("email", "is required");
		} else if !is_plausible_email(&email) {
			errors.add("email", "must be a valid email address");
		}
		if self.first_name.trim().is_empty() {
			errors.add("first_name", "is required");
		}
		if self.last_name.trim().is_empty() {
			errors.add("last_name", "is required");
		}
		if let Err(password_errors) = validate_password_strength(self.password.expose()) {
			for (field, message) in password_errors.fields() {
				errors.add(field.clone(), message.clone());
			}
		}

		errors.into_result()
	}
}

/// New display names for a user.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
	pub first_name: String,
	pub last_name: String,
}

impl UpdateProfileRequest {
	fn validate(&self) -> Result<(), ValidationErrors> {
		let mut errors = ValidationErrors::new();
		for (field, value) in [("first_name", &self.first_name), ("last_name", &self.last_name)] {
			if value.trim().is_empty() {
				errors.add(field, "is required");
			}
		}
		errors.into_result()
	}
}

fn is_plausible_email(email: &str) -> bool {
	match email.split_once('@') {
		Some((local, domain)) => {
			!local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
		}
		None => false,
	}
}

/// Authentication use cases.
#[derive(Clone)]
pub struct AuthService {
	users: Arc<dyn UserDirectory>,
	sessions: SessionAuthority,
	hasher: CredentialHasher,
	/// Hash checked when the email is unknown, so both failure paths cost
	/// one verification.
	dummy_hash: Arc<OnceLock<String>>,
}

impl AuthService {
	pub fn new(
		users: Arc<dyn UserDirectory>,
		sessions: SessionAuthority,
		hasher: CredentialHasher,
	) -> Self {
		Self {
			users,
			sessions,
			hasher,
			dummy_hash: Arc::new(OnceLock::new()),
		}
	}

	pub fn sessions(&self) -> &SessionAuthority {
		&self.sessions
	}

	pub fn hasher(&self) -> &CredentialHasher {
		&self.hasher
	}

	/// Verify credentials and open a session.
	///
	/// # Errors
	/// - [`AuthError::InvalidCredentials`] for an unknown email or wrong password
	/// - [`AuthError::AccountInactive`] if the password is right but the
	///   account is disabled
	#[instrument(level = "debug", skip_all)]
	pub async fn login(
		&self,
		ctx: &RequestContext,
		request: LoginRequest,
	) -> Result<LoginResponse, AuthError> {
		let email = normalize_email(&request.email);
		let user = ctx.run(self.users.get_user_by_email(&email)).await?;

		let Some(user) = user else {
			self.burn_verification(request.password).await;
			info!("login failed: unknown email");
			return Err(AuthError::InvalidCredentials);
		};

		let verified = self
			.hasher
			.verify_async(request.password, user.password_hash.clone())
			.await?;
		if !verified {
			info!(user_id = %user.id, "login failed: wrong password");
			return Err(AuthError::InvalidCredentials);
		}
		if !user.is_active {
			info!(user_id = %user.id, "login refused: account inactive");
			return Err(AuthError::AccountInactive);
		}

		let session = self.sessions.create_session(ctx, user.id, user.role).await?;
		info!(user_id = %user.id, role = %user.role, "login succeeded");

		Ok(LoginResponse {
			user: user.to_profile(),
			expires_at: session.expires_at,
			session_token: session.id,
		})
	}

	/// End a session. Succeeds if the session is already gone.
	#[instrument(level = "debug", skip_all)]
	pub async fn logout(&self, ctx: &RequestContext, token: &SessionToken) -> Result<(), AuthError> {
		self.sessions.delete_session(ctx, token).await
	}

	/// Extend a live session.
	#[instrument(level = "debug", skip_all)]
	pub async fn refresh(
		&self,
		ctx: &RequestContext,
		token: &SessionToken,
	) -> Result<Session, AuthError> {
		self.sessions.refresh_session(ctx, token).await
	}

	/// The live user record behind an identity.
	///
	/// # Errors
	/// [`AuthError::Unauthenticated`] if the user no longer exists or has been
	/// deactivated since the session was created.
	#[instrument(level = "debug", skip_all, fields(user_id = %identity.user_id))]
	pub async fn current_user(
		&self,
		ctx: &RequestContext,
		identity: &Identity,
	) -> Result<UserProfile, AuthError> {
		match ctx.run(self.users.get_user_by_id(&identity.user_id)).await? {
			Some(user) if user.is_active => Ok(user.to_profile()),
			Some(_) => {
				warn!("session belongs to an inactive user");
				Err(AuthError::Unauthenticated)
			}
			None => {
				warn!("session belongs to a missing user");
				Err(AuthError::Unauthenticated)
			}
		}
	}

	/// Fetch any user's public profile.
	#[instrument(level = "debug", skip_all, fields(user_id = %user_id))]
	pub async fn user_profile(
		&self,
		ctx: &RequestContext,
		user_id: &UserId,
	) -> Result<UserProfile, AuthError> {
		ctx
			.run(self.users.get_user_by_id(user_id))
			.await?
			.map(|user| user.to_profile())
			.ok_or(AuthError::UserNotFound)
	}

	/// Replace a user's display names. Authorization is the caller's job.
	///
	/// # Errors
	/// - [`AuthError::Validation`] if either name is blank
	/// - [`AuthError::UserNotFound`] if the user does not exist
	#[instrument(level = "debug", skip_all, fields(user_id = %user_id))]
	pub async fn update_profile(
		&self,
		ctx: &RequestContext,
		user_id: &UserId,
		request: UpdateProfileRequest,
	) -> Result<UserProfile, AuthError> {
		request.validate()?;

		let update = ProfileUpdate {
			first_name: request.first_name.trim().to_string(),
			last_name: request.last_name.trim().to_string(),
		};
		let user = ctx
			.run(self.users.update_profile(user_id, update))
			.await?
			.ok_or(AuthError::UserNotFound)?;

		info!(user_id = %user.id, "profile updated");
		Ok(user.to_profile())
	}

	/// Create the first admin. Only allowed while the directory is empty.
	///
	/// # Errors
	/// - [`AuthError::Validation`] for bad input, including a weak password
	/// - [`AuthError::SetupAlreadyCompleted`] if any user exists
	#[instrument(level = "debug", skip_all)]
	pub async fn setup_admin(
		&self,
		ctx: &RequestContext,
		request: SetupAdminRequest,
	) -> Result<UserProfile, AuthError> {
		request.validate()?;

		if ctx.run(self.users.count_users()).await? > 0 {
			return Err(AuthError::SetupAlreadyCompleted);
		}

		let password_hash = self.hasher.hash_async(request.password).await?;
		// Another setup may have finished while the hash was computed.
		let user = ctx
			.run(self.users.create_first_user(NewUser {
				email: normalize_email(&request.email),
				first_name: request.first_name.trim().to_string(),
				last_name: request.last_name.trim().to_string(),
				role: Role::Admin,
				password_hash,
			}))
			.await?
			.ok_or(AuthError::SetupAlreadyCompleted)?;

		info!(user_id = %user.id, "initial admin created");
		Ok(user.to_profile())
	}

	async fn burn_verification(&self, password: SecretString) {
		let hasher = self.hasher;
		let dummy_hash = self.dummy_hash.clone();
		let result = tokio::task::spawn_blocking(move || {
			let hash = match dummy_hash.get() {
				Some(hash) => hash.clone(),
				None => {
					let hash = hasher.hash("hookgate-unknown-user")?;
					dummy_hash.get_or_init(|| hash).clone()
				}
			};
			hasher.verify(password.expose(), &hash)
		})
		.await;
		if let Ok(Err(e)) = result {
			warn!(error = %e, "dummy verification failed");
		}
	}
}

impl std::fmt::Debug for AuthService {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AuthService")
			.field("sessions", &self.sessions)
			.field("hasher", &self.hasher)
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::argon2_config::HashParams;
	use crate::session::SessionConfig;
	use crate::store::MemoryStore;
	use crate::user::{MemoryUserDirectory, User};

	const PASSWORD: &str = "Sup3r-secret";

	struct Fixture {
		service: AuthService,
		users: Arc<MemoryUserDirectory>,
	}

	fn fixture() -> Fixture {
		let users = Arc::new(MemoryUserDirectory::new());
		let sessions = SessionAuthority::new(Arc::new(MemoryStore::new()), SessionConfig::default());
		let service = AuthService::new(
			users.clone(),
			sessions,
			CredentialHasher::new(HashParams::insecure_fast()),
		);
		Fixture { service, users }
	}

	async fn add_user(fixture: &Fixture, email: &str, role: Role) -> UserId {
		let now = chrono::Utc::now();
		let user = User {
			id: UserId::generate(),
			email: normalize_email(email),
			first_name: "Test".to_string(),
			last_name: "User".to_string(),
			role,
			password_hash: fixture.service.hasher().hash(PASSWORD).unwrap(),
			is_active: true,
			created_at: now,
			updated_at: now,
		};
		let id = user.id;
		fixture.users.insert(user).await;
		id
	}

	fn login_request(email: &str, password: &str) -> LoginRequest {
		LoginRequest {
			email: email.to_string(),
			password: SecretString::from(password),
		}
	}

	fn setup_request(email: &str, password: &str) -> SetupAdminRequest {
		SetupAdminRequest {
			email: email.to_string(),
			password: SecretString::from(password),
			first_name: "Root".to_string(),
			last_name: "Admin".to_string(),
		}
	}

	mod login {
		use super::*;

		#[tokio::test]
		async fn correct_credentials_open_a_session() {
			let fixture = fixture();
			let user_id = add_user(&fixture, "dev@example.com", Role::Developer).await;
			let ctx = RequestContext::background();

			let response = fixture
				.service
				.login(&ctx, login_request(" DEV@example.com", PASSWORD))
				.await
				.unwrap();
			assert_eq!(response.user.id, user_id);
			assert_eq!(response.user.role, Role::Developer);

			let session = fixture
				.service
				.sessions()
				.validate_session(&ctx, &response.session_token)
				.await
				.unwrap();
			assert_eq!(session.user_id, user_id);
			assert_eq!(session.expires_at, response.expires_at);
		}

		#[tokio::test]
		async fn wrong_password_and_unknown_email_look_the_same() {
			let fixture = fixture();
			add_user(&fixture, "dev@example.com", Role::Developer).await;
			let ctx = RequestContext::background();

			let wrong = fixture
				.service
				.login(&ctx, login_request("dev@example.com", "nope"))
				.await
				.unwrap_err();
			let unknown = fixture
				.service
				.login(&ctx, login_request("ghost@example.com", PASSWORD))
				.await
				.unwrap_err();

			assert!(matches!(wrong, AuthError::InvalidCredentials));
			assert!(matches!(unknown, AuthError::InvalidCredentials));
			assert_eq!(wrong.to_string(), unknown.to_string());
		}

		#[tokio::test]
		async fn inactive_account_is_refused_after_password_check() {
			let fixture = fixture();
			let user_id = add_user(&fixture, "old@example.com", Role::Viewer).await;
			fixture.users.set_active(&user_id, false).await;
			let ctx = RequestContext::background();

			let err = fixture
				.service
				.login(&ctx, login_request("old@example.com", PASSWORD))
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::AccountInactive));

			let err = fixture
				.service
				.login(&ctx, login_request("old@example.com", "wrong"))
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::InvalidCredentials));
		}
	}

	mod sessions {
		use super::*;

		#[tokio::test]
		async fn logout_revokes_and_is_idempotent() {
			let fixture = fixture();
			add_user(&fixture, "a@example.com", Role::Viewer).await;
			let ctx = RequestContext::background();
			let response = fixture
				.service
				.login(&ctx, login_request("a@example.com", PASSWORD))
				.await
				.unwrap();

			fixture.service.logout(&ctx, &response.session_token).await.unwrap();
			fixture.service.logout(&ctx, &response.session_token).await.unwrap();

			let err = fixture
				.service
				.refresh(&ctx, &response.session_token)
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::SessionNotFound));
		}

		#[tokio::test]
		async fn current_user_reflects_live_record() {
			let fixture = fixture();
			let user_id = add_user(&fixture, "a@example.com", Role::Developer).await;
			let ctx = RequestContext::background();
			let identity = Identity::new(user_id, Role::Developer);

			fixture.users.set_role(&user_id, Role::Viewer).await;
			let profile = fixture.service.current_user(&ctx, &identity).await.unwrap();
			assert_eq!(profile.role, Role::Viewer);

			fixture.users.set_active(&user_id, false).await;
			let err = fixture.service.current_user(&ctx, &identity).await.unwrap_err();
			assert!(matches!(err, AuthError::Unauthenticated));
		}

		#[tokio::test]
		async fn current_user_for_missing_user_is_unauthenticated() {
			let fixture = fixture();
			let identity = Identity::new(UserId::generate(), Role::Admin);
			let err = fixture
				.service
				.current_user(&RequestContext::background(), &identity)
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::Unauthenticated));
		}

		#[tokio::test]
		async fn user_profile_not_found() {
			let fixture = fixture();
			let err = fixture
				.service
				.user_profile(&RequestContext::background(), &UserId::generate())
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::UserNotFound));
		}
	}

	mod profile {
		use super::*;

		fn update(first: &str, last: &str) -> UpdateProfileRequest {
			UpdateProfileRequest {
				first_name: first.to_string(),
				last_name: last.to_string(),
			}
		}

		#[tokio::test]
		async fn names_are_trimmed_and_stored() {
			let fixture = fixture();
			let id = add_user(&fixture, "dev@example.com", Role::Developer).await;

			let profile = fixture
				.service
				.update_profile(&RequestContext::background(), &id, update(" Grace ", "Hopper"))
				.await
				.unwrap();
			assert_eq!(profile.first_name, "Grace");
			assert_eq!(profile.last_name, "Hopper");
			assert_eq!(profile.role, Role::Developer);
		}

		#[tokio::test]
		async fn blank_names_are_reported_together() {
			let fixture = fixture();
			let id = add_user(&fixture, "dev@example.com", Role::Developer).await;

			let err = fixture
				.service
				.update_profile(&RequestContext::background(), &id, update("", " "))
				.await
				.unwrap_err();
			match err {
				AuthError::Validation(errors) => {
					assert_eq!(errors.get("first_name"), Some("is required"));
					assert_eq!(errors.get("last_name"), Some("is required"));
				}
				other => panic!("unexpected error: {other:?}"),
			}
		}

		#[tokio::test]
		async fn unknown_user_is_not_found() {
			let fixture = fixture();
			let err = fixture
				.service
				.update_profile(
					&RequestContext::background(),
					&UserId::generate(),
					update("Grace", "Hopper"),
				)
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::UserNotFound));
		}
	}

	mod setup {
		use super::*;

		#[tokio::test]
		async fn first_admin_is_created_once() {
			let fixture = fixture();
			let ctx = RequestContext::background();

			let admin = fixture
				.service
				.setup_admin(&ctx, setup_request("Root@Example.com", "Adm1n!pass"))
				.await
				.unwrap();
			assert_eq!(admin.role, Role::Admin);
			assert_eq!(admin.email, "root@example.com");
			assert!(admin.is_active);

			let login = fixture
				.service
				.login(&ctx, login_request("root@example.com", "Adm1n!pass"))
				.await
				.unwrap();
			assert_eq!(login.user.id, admin.id);

			let err = fixture
				.service
				.setup_admin(&ctx, setup_request("second@example.com", "Adm1n!pass"))
				.await
				.unwrap_err();
			assert!(matches!(err, AuthError::SetupAlreadyCompleted));
		}

		#[tokio::test]
		async fn concurrent_setups_create_one_admin() {
			let fixture = fixture();
			let ctx = RequestContext::background();

			let (a, b) = tokio::join!(
				fixture
					.service
					.setup_admin(&ctx, setup_request("a@example.com", "Adm1n!pass")),
				fixture
					.service
					.setup_admin(&ctx, setup_request("b@example.com", "Adm1n!pass")),
			);

			let results = [a, b];
			assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
			assert!(results
				.iter()
				.any(|r| matches!(r, Err(AuthError::SetupAlreadyCompleted))));
			assert_eq!(fixture.users.count_users().await.unwrap(), 1);
		}

		#[tokio::test]
		async fn weak_password_is_rejected_before_anything_else() {
			let fixture = fixture();
			add_user(&fixture, "someone@example.com", Role::Viewer).await;

			let err = fixture
				.service
				.setup_admin(&RequestContext::background(), setup_request("root@example.com", "weak"))
				.await
				.unwrap_err();
			match err {
				AuthError::Validation(errors) => assert!(errors.get("password").is_some()),
				other => panic!("unexpected error: {other:?}"),
			}
		}

		#[tokio::test]
		async fn invalid_fields_are_aggregated() {
			let fixture = fixture();
			let request = SetupAdminRequest {
				email: "not-an-email".to_string(),
				password: SecretString::from("Adm1n!pass"),
				first_name: " ".to_string(),
				last_name: String::new(),
			};
			let err = fixture
				.service
				.setup_admin(&RequestContext::background(), request)
				.await
				.unwrap_err();
			match err {
				AuthError::Validation(errors) => {
					assert_eq!(errors.get("email"), Some("must be a valid email address"));
					assert_eq!(errors.get("first_name"), Some("is required"));
					assert_eq!(errors.get("last_name"), Some("is required"));
					assert!(errors.get("password").is_none());
				}
				other => panic!("unexpected error: {other:?}"),
			}
		}
	}

	#[test]
	fn plausible_email_check() {
		assert!(is_plausible_email("a@example.com"));
		assert!(!is_plausible_email("a@localhost"));
		assert!(!is_plausible_email("@example.com"));
		assert!(!is_plausible_email("example.com"));
	}
}
