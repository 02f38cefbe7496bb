use std::fmt::{Display, Formatter};

use qrdine_core::{AppResult, NonEmptyString};
use serde::Serialize;
use uuid::Uuid;

/// Role name granting restaurant-wide administration.
pub const ADMIN_ROLE: &str = "admin";

/// Role name granting platform-wide administration.
pub const SUPER_ADMIN_ROLE: &str = "super_admin";

/// Permission name that implies both admin predicates regardless of roles.
pub const SYSTEM_ADMIN_PERMISSION: &str = "system_admin";

/// Stable identifier of a permission row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a random permission identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

}

impl Display for PermissionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Stable identifier of a role row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a random role identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Atomic grant scoped to a resource and an action.
///
/// Permissions are owned by the remote store and never mutated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    id: PermissionId,
    name: NonEmptyString,
    description: Option<String>,
    resource: NonEmptyString,
    action: NonEmptyString,
}

impl Permission {
    /// Creates a validated permission.
    pub fn new(
        id: PermissionId,
        name: impl Into<String>,
        description: Option<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            description,
            resource: NonEmptyString::new(resource)?,
            action: NonEmptyString::new(action)?,
        })
    }

    /// Returns the permission identifier.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    /// Returns the unique permission name, e.g. `manage_users`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the human-readable description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the protected entity type, e.g. `users`.
    #[must_use]
    pub fn resource(&self) -> &str {
        self.resource.as_str()
    }

    /// Returns the operation tag, e.g. `write`.
    #[must_use]
    pub fn action(&self) -> &str {
        self.action.as_str()
    }

    /// Returns whether this permission covers exactly `resource` and `action`.
    #[must_use]
    pub fn matches(&self, resource: &str, action: &str) -> bool {
        self.resource() == resource && self.action() == action
    }
}

/// Named, independently activatable bundle of permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    id: RoleId,
    name: NonEmptyString,
    description: Option<String>,
    is_active: bool,
    permissions: Vec<Permission>,
}

impl Role {
    /// Creates a validated role carrying its resolved permissions.
    pub fn new(
        id: RoleId,
        name: impl Into<String>,
        description: Option<String>,
        is_active: bool,
        permissions: Vec<Permission>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            description,
            is_active,
            permissions,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the unique role name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the human-readable description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns whether the role may grant anything.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the permissions granted by this role, in store order.
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }
}
