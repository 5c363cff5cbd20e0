// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Role and ownership based access policy.
//!
//! Authorization is a table lookup: each [`Role`] maps to a fixed set of
//! [`Permission`]s, and a role holding [`Permission::All`] (`admin:*`) passes
//! every permission check. Roles carry no implied ordering; `developer` has
//! exactly what the table grants it and nothing inherited from `viewer`.
//!
//! | role      | permissions                                              |
//! |-----------|----------------------------------------------------------|
//! | admin     | every permission plus `admin:*`                          |
//! | developer | read, write, delete, manage:sources, view:analytics      |
//! | viewer    | read                                                     |
//!
//! The table is built once and shared immutably. All decisions are pure.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::AuthError;
use crate::middleware::Identity;
use crate::types::{Permission, Role, UserId};

/// Default grants.
pub const DEFAULT_ROLE_GRANTS: &[(Role, &[Permission])] = &[
	(
		Role::Admin,
		&[
			Permission::Read,
			Permission::Write,
			Permission::Delete,
			Permission::ManageUsers,
			Permission::ManageSources,
			Permission::ViewAnalytics,
			Permission::All,
		],
	),
	(
		Role::Developer,
		&[
			Permission::Read,
			Permission::Write,
			Permission::Delete,
			Permission::ManageSources,
			Permission::ViewAnalytics,
		],
	),
	(Role::Viewer, &[Permission::Read]),
];

/// Immutable role → permission set mapping.
#[derive(Debug, Clone)]
pub struct PermissionTable {
	grants: HashMap<Role, HashSet<Permission>>,
}

impl PermissionTable {
	pub fn from_grants(grants: &[(Role, &[Permission])]) -> Self {
		let grants = grants
			.iter()
			.map(|(role, permissions)| (*role, permissions.iter().copied().collect()))
			.collect();
		Self { grants }
	}

	/// Permissions granted to `role`; empty if the role has no entry.
	pub fn permissions(&self, role: Role) -> impl Iterator<Item = Permission> + '_ {
		self.grants.get(&role).into_iter().flatten().copied()
	}

	/// True if `role` holds `permission` directly or through `admin:*`.
	pub fn grants(&self, role: Role, permission: Permission) -> bool {
		self
			.grants
			.get(&role)
			.is_some_and(|set| set.contains(&permission) || set.contains(&Permission::All))
	}
}

impl Default for PermissionTable {
	fn default() -> Self {
		Self::from_grants(DEFAULT_ROLE_GRANTS)
	}
}

/// Authorization decisions over an [`Identity`].
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
	table: Arc<PermissionTable>,
}

impl AccessPolicy {
	pub fn new(table: PermissionTable) -> Self {
		Self {
			table: Arc::new(table),
		}
	}

	pub fn table(&self) -> &PermissionTable {
		&self.table
	}

	#[instrument(
		level = "debug",
		skip(self, identity),
		fields(user_id = %identity.user_id, role = %identity.role, permission = %permission)
	)]
	pub fn has_permission(&self, identity: &Identity, permission: Permission) -> bool {
		let allowed = self.table.grants(identity.role, permission);
		debug!(allowed, "permission check");
		allowed
	}

	pub fn is_admin(&self, identity: &Identity) -> bool {
		identity.role == Role::Admin
	}

	/// Admins manage everything; everyone else manages only their own resources.
	pub fn can_manage(&self, identity: &Identity, owner_id: &UserId) -> bool {
		self.is_admin(identity) || identity.user_id == *owner_id
	}

	pub fn require_permission(
		&self,
		identity: &Identity,
		permission: Permission,
	) -> Result<(), AuthError> {
		if self.has_permission(identity, permission) {
			Ok(())
		} else {
			Err(AuthError::InsufficientPermissions)
		}
	}

	pub fn require_admin(&self, identity: &Identity) -> Result<(), AuthError> {
		if self.is_admin(identity) {
			Ok(())
		} else {
			Err(AuthError::AdminRequired)
		}
	}

	pub fn require_ownership_or_admin(
		&self,
		identity: &Identity,
		owner_id: &UserId,
	) -> Result<(), AuthError> {
		if self.can_manage(identity, owner_id) {
			Ok(())
		} else {
			Err(AuthError::InsufficientPermissions)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn identity(role: Role) -> Identity {
		Identity::new(UserId::generate(), role)
	}

	mod table {
		use super::*;

		#[test]
		fn admin_holds_every_permission() {
			let policy = AccessPolicy::default();
			let admin = identity(Role::Admin);
			for permission in Permission::all() {
				assert!(policy.has_permission(&admin, *permission), "{permission}");
			}
		}

		#[test]
		fn developer_grants() {
			let policy = AccessPolicy::default();
			let dev = identity(Role::Developer);
			assert!(policy.has_permission(&dev, Permission::Read));
			assert!(policy.has_permission(&dev, Permission::Write));
			assert!(policy.has_permission(&dev, Permission::Delete));
			assert!(policy.has_permission(&dev, Permission::ManageSources));
			assert!(policy.has_permission(&dev, Permission::ViewAnalytics));
			assert!(!policy.has_permission(&dev, Permission::ManageUsers));
			assert!(!policy.has_permission(&dev, Permission::All));
		}

		#[test]
		fn viewer_only_reads() {
			let policy = AccessPolicy::default();
			let viewer = identity(Role::Viewer);
			for permission in Permission::all() {
				assert_eq!(
					policy.has_permission(&viewer, *permission),
					*permission == Permission::Read,
					"{permission}"
				);
			}
		}

		#[test]
		fn wildcard_satisfies_permissions_not_listed() {
			let table = PermissionTable::from_grants(&[(Role::Developer, &[Permission::All])]);
			assert!(table.grants(Role::Developer, Permission::ManageUsers));
			assert!(!table.grants(Role::Viewer, Permission::Read));
		}

		#[test]
		fn permissions_lists_role_grants() {
			let table = PermissionTable::default();
			let viewer: Vec<_> = table.permissions(Role::Viewer).collect();
			assert_eq!(viewer, vec![Permission::Read]);
			assert_eq!(table.permissions(Role::Admin).count(), Permission::all().len());
		}
	}

	mod ownership {
		use super::*;

		#[test]
		fn can_manage_truth_table() {
			let policy = AccessPolicy::default();
			let owner = UserId::generate();
			let other = UserId::generate();

			for role in Role::all() {
				let me = Identity::new(owner, *role);
				assert!(policy.can_manage(&me, &owner), "{role} owns");
				assert_eq!(
					policy.can_manage(&me, &other),
					*role == Role::Admin,
					"{role} on another user's resource"
				);
			}
		}

		#[test]
		fn is_admin_only_for_admin_role() {
			let policy = AccessPolicy::default();
			assert!(policy.is_admin(&identity(Role::Admin)));
			assert!(!policy.is_admin(&identity(Role::Developer)));
			assert!(!policy.is_admin(&identity(Role::Viewer)));
		}
	}

	mod assertions {
		use super::*;

		#[test]
		fn require_permission_error() {
			let policy = AccessPolicy::default();
			let err = policy
				.require_permission(&identity(Role::Viewer), Permission::ManageSources)
				.unwrap_err();
			assert!(matches!(err, AuthError::InsufficientPermissions));
			assert!(policy
				.require_permission(&identity(Role::Developer), Permission::ManageSources)
				.is_ok());
		}

		#[test]
		fn require_admin_error() {
			let policy = AccessPolicy::default();
			let err = policy.require_admin(&identity(Role::Developer)).unwrap_err();
			assert!(matches!(err, AuthError::AdminRequired));
			assert!(policy.require_admin(&identity(Role::Admin)).is_ok());
		}

		#[test]
		fn require_ownership_or_admin_error() {
			let policy = AccessPolicy::default();
			let err = policy
				.require_ownership_or_admin(&identity(Role::Developer), &UserId::generate())
				.unwrap_err();
			assert!(matches!(err, AuthError::InsufficientPermissions));
			assert!(policy
				.require_ownership_or_admin(&identity(Role::Admin), &UserId::generate())
				.is_ok());
		}
	}
}
