use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qrdine_core::{AppError, AppResult, UserId};
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::{
    AuthorizationStore, PermissionRecord, RolePermissionRecord, RoleRecord,
    UserRoleAssignmentRecord,
};

pub(crate) fn permission_record(name: &str, resource: &str, action: &str) -> PermissionRecord {
    PermissionRecord {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        description: None,
        resource: resource.to_owned(),
        action: action.to_owned(),
    }
}

pub(crate) fn role_record(
    name: &str,
    is_active: bool,
    permissions: Vec<PermissionRecord>,
) -> RoleRecord {
    RoleRecord {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        description: None,
        is_active,
        role_permissions: permissions
            .into_iter()
            .map(|permission| RolePermissionRecord {
                permission: Some(permission),
            })
            .collect(),
    }
}

pub(crate) fn assignment(role: RoleRecord) -> UserRoleAssignmentRecord {
    UserRoleAssignmentRecord {
        id: Uuid::new_v4(),
        is_active: true,
        expires_at: None,
        role: Some(role),
    }
}

pub(crate) fn expiring_assignment(
    role: RoleRecord,
    expires_at: DateTime<Utc>,
) -> UserRoleAssignmentRecord {
    UserRoleAssignmentRecord {
        expires_at: Some(expires_at),
        ..assignment(role)
    }
}

/// Store fake whose rows and failure mode can be swapped between calls.
#[derive(Default)]
pub(crate) struct FakeAuthorizationStore {
    assignments: Mutex<HashMap<UserId, Vec<UserRoleAssignmentRecord>>>,
    failure: Mutex<Option<String>>,
    calls: Mutex<Vec<UserId>>,
    gate: Mutex<Option<std::sync::Arc<Notify>>>,
}

impl FakeAuthorizationStore {
    pub(crate) async fn set_assignments(
        &self,
        user_id: UserId,
        records: Vec<UserRoleAssignmentRecord>,
    ) {
        self.assignments.lock().await.insert(user_id, records);
    }

    pub(crate) async fn fail_with(&self, reason: &str) {
        *self.failure.lock().await = Some(reason.to_owned());
    }

    pub(crate) async fn recover(&self) {
        *self.failure.lock().await = None;
    }

    pub(crate) async fn calls(&self) -> Vec<UserId> {
        self.calls.lock().await.clone()
    }

    /// Makes the next queries wait until the returned notifier fires.
    pub(crate) async fn hold(&self) -> std::sync::Arc<Notify> {
        let notify = std::sync::Arc::new(Notify::new());
        *self.gate.lock().await = Some(notify.clone());
        notify
    }
}

#[async_trait]
impl AuthorizationStore for FakeAuthorizationStore {
    async fn list_active_assignments(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleAssignmentRecord>> {
        self.calls.lock().await.push(user_id);

        let gate = self.gate.lock().await.take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(reason) = self.failure.lock().await.clone() {
            return Err(AppError::Internal(reason));
        }

        Ok(self
            .assignments
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}
