use qrdine_application::AuthorizationStore;
use qrdine_core::UserId;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::{AssignmentRow, PostgresAuthorizationStore, group_assignment_rows};

const SCHEMA: &str = include_str!("../../migrations/0001_authorization_tables.sql");

fn row(assignment_id: Uuid, role: Option<(Uuid, &str, bool)>, permission: Option<(Uuid, &str)>) -> AssignmentRow {
    AssignmentRow {
        assignment_id,
        assignment_is_active: true,
        expires_at: None,
        role_id: role.map(|(id, _, _)| id),
        role_name: role.map(|(_, name, _)| name.to_owned()),
        role_description: None,
        role_is_active: role.map(|(_, _, is_active)| is_active),
        permission_id: permission.map(|(id, _)| id),
        permission_name: permission.map(|(_, name)| name.to_owned()),
        permission_description: None,
        permission_resource: permission.map(|_| "orders".to_owned()),
        permission_action: permission.map(|_| "read".to_owned()),
    }
}

#[test]
fn join_rows_fold_into_nested_records() {
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let role_id = Uuid::new_v4();
    let rows = vec![
        row(first, Some((role_id, "manager", true)), Some((Uuid::new_v4(), "view_orders"))),
        row(first, Some((role_id, "manager", true)), Some((Uuid::new_v4(), "update_orders"))),
        row(second, None, None),
    ];

    let records = group_assignment_rows(rows);
    let Ok(records) = records else {
        panic!("rows should group");
    };

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].id, first);
    let permissions = records[0]
        .role
        .as_ref()
        .map(|role| role.role_permissions.len());
    assert_eq!(permissions, Some(2));
    assert!(records[1].role.is_none());
}

#[test]
fn role_without_permissions_keeps_empty_links() {
    let rows = vec![row(Uuid::new_v4(), Some((Uuid::new_v4(), "waiter", true)), None)];

    let records = group_assignment_rows(rows);

    assert!(records.is_ok_and(|records| {
        records[0]
            .role
            .as_ref()
            .is_some_and(|role| role.role_permissions.is_empty())
    }));
}

#[test]
fn half_joined_role_is_rejected() {
    let mut broken = row(Uuid::new_v4(), Some((Uuid::new_v4(), "waiter", true)), None);
    broken.role_name = None;

    assert!(group_assignment_rows(vec![broken]).is_err());
}

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = sqlx::raw_sql(SCHEMA).execute(&pool).await {
        panic!("failed to create authorization tables: {error}");
    }

    Some(pool)
}

async fn execute(pool: &PgPool, statement: &str, ids: &[Uuid]) {
    let mut query = sqlx::query(statement);
    for id in ids {
        query = query.bind(*id);
    }
    let result = query.execute(pool).await;
    assert!(result.is_ok(), "statement failed: {statement}");
}

#[tokio::test]
async fn active_assignments_are_loaded_with_permissions() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let suffix = Uuid::new_v4().simple().to_string();
    let user_id = UserId::random();
    let admin_role = Uuid::new_v4();
    let retired_role = Uuid::new_v4();
    let manage_users = Uuid::new_v4();

    let insert_permission = format!(
        "INSERT INTO permissions (id, name, resource, action) VALUES ($1, 'manage_users_{suffix}', 'users', 'write')"
    );
    execute(&pool, insert_permission.as_str(), &[manage_users]).await;

    let insert_roles = format!(
        "INSERT INTO roles (id, name, is_active) VALUES ($1, 'admin_{suffix}', TRUE), ($2, 'retired_{suffix}', FALSE)"
    );
    execute(&pool, insert_roles.as_str(), &[admin_role, retired_role]).await;

    execute(
        &pool,
        "INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)",
        &[admin_role, manage_users],
    )
    .await;

    execute(
        &pool,
        "INSERT INTO user_roles (id, user_id, role_id, is_active) VALUES ($1, $2, $3, TRUE), ($4, $2, $5, TRUE), ($6, $2, $3, FALSE)",
        &[
            Uuid::new_v4(),
            user_id.as_uuid(),
            admin_role,
            Uuid::new_v4(),
            retired_role,
            Uuid::new_v4(),
        ],
    )
    .await;

    let store = PostgresAuthorizationStore::new(pool);
    let records = store.list_active_assignments(user_id).await;
    let Ok(records) = records else {
        panic!("query should succeed");
    };

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.is_active));

    let admin = records
        .iter()
        .filter_map(|record| record.role.as_ref())
        .find(|role| role.id == admin_role);
    assert!(admin.is_some_and(|role| role.is_active && role.role_permissions.len() == 1));

    let retired = records
        .iter()
        .filter_map(|record| record.role.as_ref())
        .find(|role| role.id == retired_role);
    assert!(retired.is_some_and(|role| !role.is_active));
}
