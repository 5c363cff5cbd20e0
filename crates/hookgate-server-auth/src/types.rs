// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core type definitions for authentication and authorization.
//!
//! - **ID newtypes**: [`UserId`] wraps a UUID so user ids cannot be mixed up
//!   with other identifiers
//! - **Roles**: [`Role`] is a flat set (`admin`, `developer`, `viewer`) with no
//!   implied ordering; what a role may do is decided only by the permission
//!   table in [`crate::policy`]
//! - **Permissions**: [`Permission`] including the `admin:*` wildcard

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			/// Create a new ID from a UUID.
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			/// Get the inner UUID value.
			pub fn into_inner(self) -> Uuid {
				self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s).map(Self)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}
	};
}

define_id_type!(UserId, "Unique identifier for a user.");

/// Returned when a string does not name a known role or permission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseError {
	kind: &'static str,
	value: String,
}

/// A user's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	Admin,
	Developer,
	Viewer,
}

impl Role {
	pub fn all() -> &'static [Role] {
		&[Role::Admin, Role::Developer, Role::Viewer]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Admin => "admin",
			Role::Developer => "developer",
			Role::Viewer => "viewer",
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Role::all()
			.iter()
			.copied()
			.find(|role| role.as_str() == s)
			.ok_or_else(|| ParseError {
				kind: "role",
				value: s.to_string(),
			})
	}
}

/// A capability checked by the access policy.
///
/// [`Permission::All`] (`admin:*`) satisfies every permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
	#[serde(rename = "read")]
	Read,
	#[serde(rename = "write")]
	Write,
	#[serde(rename = "delete")]
	Delete,
	#[serde(rename = "manage:users")]
	ManageUsers,
	#[serde(rename = "manage:sources")]
	ManageSources,
	#[serde(rename = "view:analytics")]
	ViewAnalytics,
	#[serde(rename = "admin:*")]
	All,
}

impl Permission {
	pub fn all() -> &'static [Permission] {
		&[
			Permission::Read,
			Permission::Write,
			Permission::Delete,
			Permission::ManageUsers,
			Permission::ManageSources,
			Permission::ViewAnalytics,
			Permission::All,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Permission::Read => "read",
			Permission::Write => "write",
			Permission::Delete => "delete",
			Permission::ManageUsers => "manage:users",
			Permission::ManageSources => "manage:sources",
			Permission::ViewAnalytics => "view:analytics",
			Permission::All => "admin:*",
		}
	}
}

impl fmt::Display for Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Permission {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Permission::all()
			.iter()
			.copied()
			.find(|permission| permission.as_str() == s)
			.ok_or_else(|| ParseError {
				kind: "permission",
				value: s.to_string(),
			})
	}
}
