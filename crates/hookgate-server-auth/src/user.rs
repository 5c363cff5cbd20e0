// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User records and the directory the auth core reads them from.
//!
//! This module provides:
//! - [`User`] - stored user including the password hash
//! - [`UserProfile`] - public view of a user, safe to return from the API
//! - [`UserDirectory`] - the lookup interface the auth service depends on
//! - [`MemoryUserDirectory`] - in-process implementation for development and tests

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::AuthError;
use crate::types::{Role, UserId};

/// Trim whitespace and lowercase an email address.
pub fn normalize_email(email: &str) -> String {
	email.trim().to_lowercase()
}

/// A stored user.
#[derive(Clone, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	/// Normalized (trimmed, lowercase) email address.
	pub email: String,
	pub first_name: String,
	pub last_name: String,
	pub role: Role,
	/// Argon2id PHC string. Never serialized to clients.
	#[serde(skip_serializing)]
	pub password_hash: String,
	pub is_active: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("User")
			.field("id", &self.id)
			.field("role", &self.role)
			.field("is_active", &self.is_active)
			.finish_non_exhaustive()
	}
}

impl User {
	pub fn to_profile(&self) -> UserProfile {
		UserProfile {
			id: self.id,
			email: self.email.clone(),
			first_name: self.first_name.clone(),
			last_name: self.last_name.clone(),
			role: self.role,
			is_active: self.is_active,
			created_at: self.created_at,
		}
	}
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
	pub id: UserId,
	pub email: String,
	pub first_name: String,
	pub last_name: String,
	pub role: Role,
	pub is_active: bool,
	pub created_at: DateTime<Utc>,
}

/// Data for creating a user.
#[derive(Clone)]
pub struct NewUser {
	pub email: String,
	pub first_name: String,
	pub last_name: String,
	pub role: Role,
	pub password_hash: String,
}

/// Changes a user may make to their own profile.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
	pub first_name: String,
	pub last_name: String,
}

/// Read access to users, plus the writes needed for first-admin setup and
/// profile edits.
#[async_trait]
pub trait UserDirectory: Send + Sync {
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;

	/// Look up by email; implementations normalize the argument.
	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

	async fn count_users(&self) -> Result<u64, AuthError>;

	/// Create `new_user` only if the directory holds no users. The emptiness
	/// check and the insert must be atomic.
	///
	/// Returns `None` without writing when a user already exists.
	async fn create_first_user(&self, new_user: NewUser) -> Result<Option<User>, AuthError>;

	/// Apply `update` to an existing user. `None` if the user does not exist.
	async fn update_profile(
		&self,
		id: &UserId,
		update: ProfileUpdate,
	) -> Result<Option<User>, AuthError>;
}

/// In-process [`UserDirectory`].
#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
	users: RwLock<HashMap<UserId, User>>,
}

impl MemoryUserDirectory {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert or replace a user record.
	pub async fn insert(&self, user: User) {
		self.users.write().await.insert(user.id, user);
	}

	/// Flip a user's active flag. Returns false if the user does not exist.
	pub async fn set_active(&self, id: &UserId, is_active: bool) -> bool {
		match self.users.write().await.get_mut(id) {
			Some(user) => {
				user.is_active = is_active;
				user.updated_at = Utc::now();
				true
			}
			None => false,
		}
	}

	/// Change a user's role. Returns false if the user does not exist.
	pub async fn set_role(&self, id: &UserId, role: Role) -> bool {
		match self.users.write().await.get_mut(id) {
			Some(user) => {
				user.role = role;
				user.updated_at = Utc::now();
				true
			}
			None => false,
		}
	}
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
	async fn get_user_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError> {
		Ok(self.users.read().await.get(id).cloned())
	}

	async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
		let email = normalize_email(email);
		Ok(self
			.users
			.read()
			.await
			.values()
			.find(|user| user.email == email)
			.cloned())
	}

	async fn count_users(&self) -> Result<u64, AuthError> {
		Ok(self.users.read().await.len() as u64)
	}

	async fn create_first_user(&self, new_user: NewUser) -> Result<Option<User>, AuthError> {
		let mut users = self.users.write().await;
		if !users.is_empty() {
			return Ok(None);
		}

		let now = Utc::now();
		let user = User {
			id: UserId::generate(),
			email: normalize_email(&new_user.email),
			first_name: new_user.first_name,
			last_name: new_user.last_name,
			role: new_user.role,
			password_hash: new_user.password_hash,
			is_active: true,
			created_at: now,
			updated_at: now,
		};
		users.insert(user.id, user.clone());
		Ok(Some(user))
	}

	async fn update_profile(
		&self,
		id: &UserId,
		update: ProfileUpdate,
	) -> Result<Option<User>, AuthError> {
		let mut users = self.users.write().await;
		Ok(users.get_mut(id).map(|user| {
			user.first_name = update.first_name;
			user.last_name = update.last_name;
			user.updated_at = Utc::now();
			user.clone()
		}))
	}
}
