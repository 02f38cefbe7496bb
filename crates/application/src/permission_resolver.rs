use std::sync::Arc;

use chrono::{DateTime, Utc};
use qrdine_core::{AppResult, UserId};
use qrdine_domain::AuthorizationSnapshot;
use tracing::{debug, warn};

use crate::{AuthorizationStore, UserRoleAssignmentRecord};

/// Source of the current time used for assignment expiry checks.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Tunables for snapshot resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Skip assignments whose `expires_at` has passed even if still flagged active.
    ///
    /// Off by default: the store is trusted to deactivate expired assignments.
    pub enforce_assignment_expiry: bool,
}

/// Result of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The store answered and the snapshot was rebuilt.
    Resolved(AuthorizationSnapshot),
    /// The store could not be queried or returned malformed rows.
    Failed {
        /// Human-readable failure reason.
        reason: String,
    },
}

impl ResolveOutcome {
    /// Returns whether the resolution succeeded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Returns the resolved snapshot, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<&AuthorizationSnapshot> {
        match self {
            Self::Resolved(snapshot) => Some(snapshot),
            Self::Failed { .. } => None,
        }
    }
}

/// Fetches a user's active assignments and flattens them into a snapshot.
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn AuthorizationStore>,
    options: ResolverOptions,
    clock: Clock,
}

impl PermissionResolver {
    /// Creates a resolver using wall-clock time.
    #[must_use]
    pub fn new(store: Arc<dyn AuthorizationStore>, options: ResolverOptions) -> Self {
        Self::with_clock(store, options, Arc::new(Utc::now))
    }

    /// Creates a resolver with an explicit clock.
    #[must_use]
    pub fn with_clock(
        store: Arc<dyn AuthorizationStore>,
        options: ResolverOptions,
        clock: Clock,
    ) -> Self {
        Self {
            store,
            options,
            clock,
        }
    }

    /// Queries the store and builds a fresh snapshot, propagating failures.
    pub async fn fetch(&self, user_id: UserId) -> AppResult<AuthorizationSnapshot> {
        let assignments = self.store.list_active_assignments(user_id).await?;
        debug!(
            user_id = %user_id,
            assignment_count = assignments.len(),
            "loaded role assignments"
        );

        flatten_assignments(assignments, (self.clock)(), self.options)
    }

    /// Like [`Self::fetch`] but logs failures and reports them as a value.
    pub async fn resolve(&self, user_id: UserId) -> ResolveOutcome {
        match self.fetch(user_id).await {
            Ok(snapshot) => ResolveOutcome::Resolved(snapshot),
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "failed to resolve user permissions");
                ResolveOutcome::Failed {
                    reason: error.to_string(),
                }
            }
        }
    }
}

/// Flattens assignment rows into a snapshot.
///
/// Assignments without a joined role or with an inactive role are skipped.
/// Permissions are de-duplicated by id across roles.
pub fn flatten_assignments(
    assignments: Vec<UserRoleAssignmentRecord>,
    now: DateTime<Utc>,
    options: ResolverOptions,
) -> AppResult<AuthorizationSnapshot> {
    let mut snapshot = AuthorizationSnapshot::empty();

    for assignment in assignments {
        if !assignment.is_active {
            continue;
        }

        if assignment.is_expired_at(now) {
            if options.enforce_assignment_expiry {
                debug!(assignment_id = %assignment.id, "skipping expired role assignment");
                continue;
            }
            warn!(
                assignment_id = %assignment.id,
                expires_at = ?assignment.expires_at,
                "honouring expired role assignment still flagged active"
            );
        }

        let Some(role) = assignment.role else {
            continue;
        };
        if !role.is_active {
            continue;
        }

        snapshot.push_role(role.into_role()?);
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests;
