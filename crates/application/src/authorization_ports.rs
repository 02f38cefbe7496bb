use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qrdine_core::{AppResult, UserId};
use qrdine_domain::{Permission, PermissionId, Role, RoleId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Permission row as returned by the nested-join query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Permission id.
    pub id: Uuid,
    /// Unique permission name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Protected entity type.
    pub resource: String,
    /// Operation tag.
    pub action: String,
}

impl PermissionRecord {
    /// Validates the row into a domain permission.
    pub fn into_permission(self) -> AppResult<Permission> {
        Permission::new(
            PermissionId::from_uuid(self.id),
            self.name,
            self.description,
            self.resource,
            self.action,
        )
    }
}

/// Role-permission link row with its joined permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionRecord {
    /// Joined permission, absent when the link dangles.
    #[serde(default)]
    pub permission: Option<PermissionRecord>,
}

/// Role row with its joined role-permission links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    /// Role id.
    pub id: Uuid,
    /// Unique role name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the role itself is enabled.
    pub is_active: bool,
    /// Links to granted permissions.
    #[serde(default)]
    pub role_permissions: Vec<RolePermissionRecord>,
}

impl RoleRecord {
    /// Validates the row and its reachable permissions into a domain role.
    pub fn into_role(self) -> AppResult<Role> {
        let permissions = self
            .role_permissions
            .into_iter()
            .filter_map(|link| link.permission)
            .map(PermissionRecord::into_permission)
            .collect::<AppResult<Vec<_>>>()?;

        Role::new(
            RoleId::from_uuid(self.id),
            self.name,
            self.description,
            self.is_active,
            permissions,
        )
    }
}

/// User-role assignment row with its joined role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleAssignmentRecord {
    /// Assignment id.
    pub id: Uuid,
    /// Whether the assignment is enabled.
    pub is_active: bool,
    /// Optional end of validity.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Joined role, absent when the role row is missing or hidden.
    #[serde(default)]
    pub role: Option<RoleRecord>,
}

impl UserRoleAssignmentRecord {
    /// Returns whether `expires_at` lies at or before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Repository port for the remote authorization tables.
#[async_trait]
pub trait AuthorizationStore: Send + Sync {
    /// Lists the active role assignments of a user with roles and permissions expanded.
    ///
    /// Implementations must only return rows where `user_id` matches and the
    /// assignment `is_active` flag is set.
    async fn list_active_assignments(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleAssignmentRecord>>;
}
