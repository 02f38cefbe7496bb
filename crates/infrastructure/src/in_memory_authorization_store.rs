use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qrdine_application::{
    AuthorizationStore, PermissionRecord, RolePermissionRecord, RoleRecord,
    UserRoleAssignmentRecord,
};
use qrdine_core::{AppError, AppResult, UserId};
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Role row of an [`AuthorizationFixture`].
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureRole {
    /// Role id.
    pub id: Uuid,
    /// Unique role name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the role is enabled.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Ids of granted permissions.
    #[serde(default)]
    pub permission_ids: Vec<Uuid>,
}

/// Assignment row of an [`AuthorizationFixture`].
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureAssignment {
    /// Assignment id.
    pub id: Uuid,
    /// Assigned user.
    pub user_id: UserId,
    /// Assigned role.
    pub role_id: Uuid,
    /// Whether the assignment is enabled.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Optional end of validity.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Table contents used to seed an [`InMemoryAuthorizationStore`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorizationFixture {
    /// Permission rows.
    #[serde(default)]
    pub permissions: Vec<PermissionRecord>,
    /// Role rows with their grants.
    #[serde(default)]
    pub roles: Vec<FixtureRole>,
    /// User-role assignment rows.
    #[serde(default)]
    pub assignments: Vec<FixtureAssignment>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone)]
struct StoredRole {
    name: String,
    description: Option<String>,
    is_active: bool,
}

#[derive(Debug, Clone)]
struct StoredAssignment {
    id: Uuid,
    user_id: UserId,
    role_id: Uuid,
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Tables {
    permissions: HashMap<Uuid, PermissionRecord>,
    roles: HashMap<Uuid, StoredRole>,
    role_permissions: Vec<(Uuid, Uuid)>,
    assignments: Vec<StoredAssignment>,
}

/// In-memory authorization tables.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationStore {
    tables: RwLock<Tables>,
}

impl InMemoryAuthorizationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded from fixture rows.
    pub async fn from_fixture(fixture: AuthorizationFixture) -> AppResult<Self> {
        let store = Self::new();
        for permission in fixture.permissions {
            store.insert_permission(permission).await?;
        }
        for role in fixture.roles {
            store
                .insert_role(role.id, role.name, role.description, role.is_active)
                .await?;
            for permission_id in role.permission_ids {
                store.grant(role.id, permission_id).await?;
            }
        }
        for assignment in fixture.assignments {
            store
                .insert_assignment(StoredAssignment {
                    id: assignment.id,
                    user_id: assignment.user_id,
                    role_id: assignment.role_id,
                    is_active: assignment.is_active,
                    expires_at: assignment.expires_at,
                })
                .await?;
        }
        Ok(store)
    }

    /// Adds a permission row.
    pub async fn insert_permission(&self, permission: PermissionRecord) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .permissions
            .values()
            .any(|existing| existing.name == permission.name)
        {
            return Err(AppError::Validation(format!(
                "permission '{}' already exists",
                permission.name
            )));
        }
        tables.permissions.insert(permission.id, permission);
        Ok(())
    }

    /// Adds a role row without grants.
    pub async fn insert_role(
        &self,
        id: Uuid,
        name: impl Into<String>,
        description: Option<String>,
        is_active: bool,
    ) -> AppResult<()> {
        let name = name.into();
        let mut tables = self.tables.write().await;
        if tables.roles.values().any(|existing| existing.name == name) {
            return Err(AppError::Validation(format!("role '{name}' already exists")));
        }
        tables.roles.insert(
            id,
            StoredRole {
                name,
                description,
                is_active,
            },
        );
        Ok(())
    }

    /// Links a permission to a role. Granting twice is a no-op.
    pub async fn grant(&self, role_id: Uuid, permission_id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.roles.contains_key(&role_id) {
            return Err(AppError::NotFound(format!("role '{role_id}'")));
        }
        if !tables.permissions.contains_key(&permission_id) {
            return Err(AppError::NotFound(format!("permission '{permission_id}'")));
        }
        if !tables.role_permissions.contains(&(role_id, permission_id)) {
            tables.role_permissions.push((role_id, permission_id));
        }
        Ok(())
    }

    /// Assigns a role to a user and returns the assignment id.
    pub async fn assign(
        &self,
        user_id: UserId,
        role_id: Uuid,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        self.insert_assignment(StoredAssignment {
            id,
            user_id,
            role_id,
            is_active: true,
            expires_at,
        })
        .await?;
        Ok(id)
    }

    /// Flips the active flag of a role.
    pub async fn set_role_active(&self, role_id: Uuid, is_active: bool) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let role = tables
            .roles
            .get_mut(&role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}'")))?;
        role.is_active = is_active;
        Ok(())
    }

    /// Flips the active flag of an assignment.
    pub async fn set_assignment_active(&self, assignment_id: Uuid, is_active: bool) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let assignment = tables
            .assignments
            .iter_mut()
            .find(|assignment| assignment.id == assignment_id)
            .ok_or_else(|| AppError::NotFound(format!("assignment '{assignment_id}'")))?;
        assignment.is_active = is_active;
        Ok(())
    }

    async fn insert_assignment(&self, assignment: StoredAssignment) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.roles.contains_key(&assignment.role_id) {
            return Err(AppError::NotFound(format!("role '{}'", assignment.role_id)));
        }
        tables.assignments.push(assignment);
        Ok(())
    }
}

#[async_trait]
impl AuthorizationStore for InMemoryAuthorizationStore {
    async fn list_active_assignments(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleAssignmentRecord>> {
        let tables = self.tables.read().await;

        Ok(tables
            .assignments
            .iter()
            .filter(|assignment| assignment.user_id == user_id && assignment.is_active)
            .map(|assignment| UserRoleAssignmentRecord {
                id: assignment.id,
                is_active: assignment.is_active,
                expires_at: assignment.expires_at,
                role: tables.roles.get(&assignment.role_id).map(|role| RoleRecord {
                    id: assignment.role_id,
                    name: role.name.clone(),
                    description: role.description.clone(),
                    is_active: role.is_active,
                    role_permissions: tables
                        .role_permissions
                        .iter()
                        .filter(|(role_id, _)| *role_id == assignment.role_id)
                        .map(|(_, permission_id)| RolePermissionRecord {
                            permission: tables.permissions.get(permission_id).cloned(),
                        })
                        .collect(),
                }),
            })
            .collect())
    }
}
