use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qrdine_application::{
    AuthorizationStore, PermissionRecord, RolePermissionRecord, RoleRecord,
    UserRoleAssignmentRecord,
};
use qrdine_core::{AppError, AppResult, UserId};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// PostgreSQL-backed store reading the authorization tables directly.
#[derive(Clone)]
pub struct PostgresAuthorizationStore {
    pool: PgPool,
}

impl PostgresAuthorizationStore {
    /// Creates a store with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct AssignmentRow {
    pub(crate) assignment_id: Uuid,
    pub(crate) assignment_is_active: bool,
    pub(crate) expires_at: Option<DateTime<Utc>>,
    pub(crate) role_id: Option<Uuid>,
    pub(crate) role_name: Option<String>,
    pub(crate) role_description: Option<String>,
    pub(crate) role_is_active: Option<bool>,
    pub(crate) permission_id: Option<Uuid>,
    pub(crate) permission_name: Option<String>,
    pub(crate) permission_description: Option<String>,
    pub(crate) permission_resource: Option<String>,
    pub(crate) permission_action: Option<String>,
}

#[async_trait]
impl AuthorizationStore for PostgresAuthorizationStore {
    async fn list_active_assignments(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleAssignmentRecord>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT
                user_roles.id AS assignment_id,
                user_roles.is_active AS assignment_is_active,
                user_roles.expires_at,
                roles.id AS role_id,
                roles.name AS role_name,
                roles.description AS role_description,
                roles.is_active AS role_is_active,
                permissions.id AS permission_id,
                permissions.name AS permission_name,
                permissions.description AS permission_description,
                permissions.resource AS permission_resource,
                permissions.action AS permission_action
            FROM user_roles
            LEFT JOIN roles
                ON roles.id = user_roles.role_id
            LEFT JOIN role_permissions
                ON role_permissions.role_id = roles.id
            LEFT JOIN permissions
                ON permissions.id = role_permissions.permission_id
            WHERE user_roles.user_id = $1
                AND user_roles.is_active = TRUE
            ORDER BY user_roles.created_at, user_roles.id, permissions.name
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load role assignments for user '{user_id}': {error}"
            ))
        })?;

        group_assignment_rows(rows)
    }
}

/// Folds flat join rows back into one record per assignment, keeping row order.
pub(crate) fn group_assignment_rows(
    rows: Vec<AssignmentRow>,
) -> AppResult<Vec<UserRoleAssignmentRecord>> {
    let mut records: Vec<UserRoleAssignmentRecord> = Vec::new();
    let mut positions: HashMap<Uuid, usize> = HashMap::new();

    for row in rows {
        let position = match positions.get(&row.assignment_id) {
            Some(position) => *position,
            None => {
                let role = role_from_row(&row)?;
                records.push(UserRoleAssignmentRecord {
                    id: row.assignment_id,
                    is_active: row.assignment_is_active,
                    expires_at: row.expires_at,
                    role,
                });
                positions.insert(row.assignment_id, records.len() - 1);
                records.len() - 1
            }
        };

        let Some(permission) = permission_from_row(&row)? else {
            continue;
        };
        if let Some(role) = records[position].role.as_mut() {
            role.role_permissions.push(RolePermissionRecord {
                permission: Some(permission),
            });
        }
    }

    Ok(records)
}

fn role_from_row(row: &AssignmentRow) -> AppResult<Option<RoleRecord>> {
    let Some(role_id) = row.role_id else {
        return Ok(None);
    };

    let (Some(name), Some(is_active)) = (row.role_name.clone(), row.role_is_active) else {
        return Err(AppError::Internal(format!(
            "role '{role_id}' joined without name or active flag"
        )));
    };

    Ok(Some(RoleRecord {
        id: role_id,
        name,
        description: row.role_description.clone(),
        is_active,
        role_permissions: Vec::new(),
    }))
}

fn permission_from_row(row: &AssignmentRow) -> AppResult<Option<PermissionRecord>> {
    let Some(permission_id) = row.permission_id else {
        return Ok(None);
    };

    let (Some(name), Some(resource), Some(action)) = (
        row.permission_name.clone(),
        row.permission_resource.clone(),
        row.permission_action.clone(),
    ) else {
        return Err(AppError::Internal(format!(
            "permission '{permission_id}' joined with missing columns"
        )));
    };

    Ok(Some(PermissionRecord {
        id: permission_id,
        name,
        description: row.permission_description.clone(),
        resource,
        action,
    }))
}

#[cfg(test)]
mod tests;
