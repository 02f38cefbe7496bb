//! Flattened view of a user's effective roles and permissions.

use std::collections::HashSet;

use serde::Serialize;

use crate::security::{
    ADMIN_ROLE, Permission, PermissionId, Role, SUPER_ADMIN_ROLE, SYSTEM_ADMIN_PERMISSION,
};

/// Effective roles and de-duplicated permissions of one user at a point in time.
///
/// Only active roles are ever stored, and every permission appears once no
/// matter how many roles grant it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthorizationSnapshot {
    roles: Vec<Role>,
    permissions: Vec<Permission>,
    #[serde(skip)]
    permission_ids: HashSet<PermissionId>,
}

impl AuthorizationSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot from roles, dropping inactive ones.
    #[must_use]
    pub fn from_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut snapshot = Self::empty();
        for role in roles {
            snapshot.push_role(role);
        }
        snapshot
    }

    /// Adds a role and merges its permissions into the flattened list.
    ///
    /// Returns `false` without touching the snapshot when the role is inactive.
    pub fn push_role(&mut self, role: Role) -> bool {
        if !role.is_active() {
            return false;
        }

        for permission in role.permissions() {
            if self.permission_ids.insert(permission.id()) {
                self.permissions.push(permission.clone());
            }
        }
        self.roles.push(role);
        true
    }

    /// Returns the active roles in resolution order.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// Returns the flattened permissions in first-seen order.
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Returns whether neither roles nor permissions are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.permissions.is_empty()
    }

    /// Returns whether any flattened permission carries `name`.
    #[must_use]
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions
            .iter()
            .any(|permission| permission.name() == name)
    }

    /// Returns whether an active role named `name` is present.
    #[must_use]
    pub fn has_role(&self, name: &str) -> bool {
        self.roles
            .iter()
            .any(|role| role.is_active() && role.name() == name)
    }

    /// Returns whether at least one of `names` is an active role.
    #[must_use]
    pub fn has_any_role<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().any(|name| self.has_role(name.as_ref()))
    }

    /// Returns whether a permission matches both `resource` and `action` exactly.
    #[must_use]
    pub fn has_resource_permission(&self, resource: &str, action: &str) -> bool {
        self.permissions
            .iter()
            .any(|permission| permission.matches(resource, action))
    }

    /// Returns whether the user administers at least one restaurant.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_any_role(&[ADMIN_ROLE, SUPER_ADMIN_ROLE])
            || self.has_permission(SYSTEM_ADMIN_PERMISSION)
    }

    /// Returns whether the user administers the whole platform.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.has_role(SUPER_ADMIN_ROLE) || self.has_permission(SYSTEM_ADMIN_PERMISSION)
    }
}
