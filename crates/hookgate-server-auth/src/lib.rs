// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity, credential and authorization core for hookgate.
//!
//! - [`password`] - Argon2id credential hashing and the password strength policy
//! - [`session`] - opaque-token sessions in an expiring key-value [`store`]
//! - [`policy`] - role → permission table and ownership checks
//! - [`middleware`] - framework-independent stages of the enforcement chain
//! - [`source_auth`] - validation of webhook-source auth configuration
//! - [`service`] - login, logout, refresh and first-admin setup
//!
//! Components emit `tracing` events and never install a subscriber.

pub mod argon2_config;
pub mod context;
pub mod error;
pub mod middleware;
pub mod password;
pub mod policy;
pub mod service;
pub mod session;
pub mod source_auth;
pub mod store;
pub mod types;
pub mod user;

pub use argon2_config::HashParams;
pub use context::RequestContext;
pub use error::{AuthError, Result, ValidationErrors};
pub use middleware::{
	extract_session_token, resolve_identity, AccessRequirement, AuthConfig, AuthContext, Identity,
};
pub use password::{validate_password_strength, CredentialHasher};
pub use policy::{AccessPolicy, PermissionTable};
pub use service::{
	AuthService, LoginRequest, LoginResponse, SetupAdminRequest, UpdateProfileRequest,
};
pub use session::{Session, SessionAuthority, SessionConfig, SessionToken, MAX_SESSION_TTL};
pub use source_auth::{
	resolve_auth_config_update, AuthType, SignatureAlgorithm, SignatureEncoding, SourceAuthConfig,
	StoredAuthConfig,
};
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use types::{Permission, Role, UserId};
pub use user::{
	MemoryUserDirectory, NewUser, ProfileUpdate, User, UserDirectory, UserProfile,
};
