use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use qrdine_core::UserId;

use crate::test_support::{
    FakeAuthorizationStore, assignment, expiring_assignment, permission_record, role_record,
};
use crate::{RolePermissionRecord, UserRoleAssignmentRecord};

use super::{PermissionResolver, ResolveOutcome, ResolverOptions, flatten_assignments};

fn fixed_now() -> chrono::DateTime<Utc> {
    match Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0) {
        chrono::LocalResult::Single(value) => value,
        _ => panic!("fixed timestamp must be valid"),
    }
}

fn resolver(store: Arc<FakeAuthorizationStore>, options: ResolverOptions) -> PermissionResolver {
    PermissionResolver::with_clock(store, options, Arc::new(fixed_now))
}

#[tokio::test]
async fn admin_assignment_resolves_roles_and_permissions() {
    let store = Arc::new(FakeAuthorizationStore::default());
    let user_id = UserId::random();
    store
        .set_assignments(
            user_id,
            vec![assignment(role_record(
                "admin",
                true,
                vec![permission_record("manage_users", "users", "write")],
            ))],
        )
        .await;

    let snapshot = resolver(store, ResolverOptions::default()).fetch(user_id).await;
    let Ok(snapshot) = snapshot else {
        panic!("fetch should succeed");
    };

    assert!(snapshot.is_admin());
    assert!(snapshot.has_resource_permission("users", "write"));
    assert!(!snapshot.has_resource_permission("users", "read"));
}

#[tokio::test]
async fn inactive_role_is_dropped() {
    let store = Arc::new(FakeAuthorizationStore::default());
    let user_id = UserId::random();
    store
        .set_assignments(
            user_id,
            vec![assignment(role_record(
                "admin",
                false,
                vec![permission_record("manage_users", "users", "write")],
            ))],
        )
        .await;

    let outcome = resolver(store, ResolverOptions::default())
        .resolve(user_id)
        .await;
    let Some(snapshot) = outcome.snapshot() else {
        panic!("resolution should succeed");
    };

    assert!(snapshot.roles().is_empty());
    assert!(snapshot.permissions().is_empty());
    assert!(!snapshot.has_role("admin"));
}

#[tokio::test]
async fn user_without_assignments_gets_empty_snapshot() {
    let store = Arc::new(FakeAuthorizationStore::default());
    let outcome = resolver(store, ResolverOptions::default())
        .resolve(UserId::random())
        .await;

    assert!(matches!(outcome, ResolveOutcome::Resolved(ref snapshot) if snapshot.is_empty()));
}

#[tokio::test]
async fn store_failure_is_reported_not_raised() {
    let store = Arc::new(FakeAuthorizationStore::default());
    store.fail_with("connection reset").await;
    let resolver = resolver(store, ResolverOptions::default());

    assert!(resolver.fetch(UserId::random()).await.is_err());

    let outcome = resolver.resolve(UserId::random()).await;
    match outcome {
        ResolveOutcome::Failed { reason } => assert!(reason.contains("connection reset")),
        ResolveOutcome::Resolved(_) => panic!("failure must not resolve"),
    }
}

#[test]
fn permission_granted_by_two_roles_is_flattened_once() {
    let shared = permission_record("view_orders", "orders", "read");
    let records = vec![
        assignment(role_record("waiter", true, vec![shared.clone()])),
        assignment(role_record(
            "manager",
            true,
            vec![shared, permission_record("manage_menu", "menu_items", "write")],
        )),
    ];

    let snapshot = flatten_assignments(records, fixed_now(), ResolverOptions::default());
    let Ok(snapshot) = snapshot else {
        panic!("flatten should succeed");
    };

    let names: Vec<&str> = snapshot
        .permissions()
        .iter()
        .map(|permission| permission.name())
        .collect();
    assert_eq!(names, vec!["view_orders", "manage_menu"]);
    assert_eq!(snapshot.roles()[1].permissions().len(), 2);
}

#[test]
fn dangling_joins_are_skipped() {
    let mut role = role_record("waiter", true, vec![permission_record("view_orders", "orders", "read")]);
    role.role_permissions.push(RolePermissionRecord { permission: None });
    let records = vec![
        assignment(role),
        UserRoleAssignmentRecord {
            role: None,
            ..assignment(role_record("ghost", true, Vec::new()))
        },
    ];

    let snapshot = flatten_assignments(records, fixed_now(), ResolverOptions::default());
    assert!(matches!(snapshot, Ok(ref snapshot) if snapshot.roles().len() == 1 && snapshot.permissions().len() == 1));
}

#[test]
fn inactive_assignment_is_ignored_even_if_returned() {
    let records = vec![UserRoleAssignmentRecord {
        is_active: false,
        ..assignment(role_record("admin", true, Vec::new()))
    }];

    let snapshot = flatten_assignments(records, fixed_now(), ResolverOptions::default());
    assert!(matches!(snapshot, Ok(ref snapshot) if snapshot.is_empty()));
}

#[test]
fn expired_assignment_is_honoured_by_default() {
    let records = vec![expiring_assignment(
        role_record("admin", true, Vec::new()),
        fixed_now() - Duration::days(1),
    )];

    let snapshot = flatten_assignments(records, fixed_now(), ResolverOptions::default());
    assert!(matches!(snapshot, Ok(ref snapshot) if snapshot.has_role("admin")));
}

#[test]
fn expired_assignment_is_skipped_when_enforced() {
    let options = ResolverOptions {
        enforce_assignment_expiry: true,
    };
    let records = vec![
        expiring_assignment(
            role_record("admin", true, Vec::new()),
            fixed_now() - Duration::minutes(5),
        ),
        expiring_assignment(
            role_record("waiter", true, Vec::new()),
            fixed_now() + Duration::days(30),
        ),
    ];

    let snapshot = flatten_assignments(records, fixed_now(), options);
    let Ok(snapshot) = snapshot else {
        panic!("flatten should succeed");
    };

    assert!(!snapshot.has_role("admin"));
    assert!(snapshot.has_role("waiter"));
}

#[test]
fn malformed_permission_row_fails_the_flatten() {
    let records = vec![assignment(role_record(
        "admin",
        true,
        vec![permission_record("", "users", "write")],
    ))];

    assert!(flatten_assignments(records, fixed_now(), ResolverOptions::default()).is_err());
}

#[tokio::test]
async fn repeated_resolution_is_stable() {
    let store = Arc::new(FakeAuthorizationStore::default());
    let user_id = UserId::random();
    store
        .set_assignments(
            user_id,
            vec![
                assignment(role_record(
                    "manager",
                    true,
                    vec![permission_record("manage_menu", "menu_items", "write")],
                )),
                assignment(role_record("waiter", true, Vec::new())),
            ],
        )
        .await;
    let resolver = resolver(store, ResolverOptions::default());

    let first = resolver.resolve(user_id).await;
    let second = resolver.resolve(user_id).await;
    assert_eq!(first, second);
}
