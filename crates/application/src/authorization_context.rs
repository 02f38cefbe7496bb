use std::sync::Arc;

use qrdine_core::{AppError, AppResult, AuthenticatedUser, UserId};
use qrdine_domain::AuthorizationSnapshot;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::{PermissionResolver, ResolveOutcome};

/// What the context keeps when a fetch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchFailurePolicy {
    /// Keep the last successfully resolved snapshot.
    #[default]
    RetainPrevious,
    /// Drop to an empty snapshot so every check denies.
    ClearSnapshot,
}

/// Observable authorization state of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationState {
    /// User the snapshot belongs to, if signed in.
    pub user_id: Option<UserId>,
    /// Latest snapshot.
    pub snapshot: AuthorizationSnapshot,
    /// Whether a resolution is outstanding or none has completed yet.
    pub loading: bool,
    /// Reason of the most recent failed resolution, cleared on success.
    pub last_error: Option<String>,
}

impl AuthorizationState {
    fn initial() -> Self {
        Self {
            user_id: None,
            snapshot: AuthorizationSnapshot::empty(),
            loading: true,
            last_error: None,
        }
    }
}

struct ContextInner {
    resolver: Arc<PermissionResolver>,
    failure_policy: FetchFailurePolicy,
    state: watch::Sender<AuthorizationState>,
}

/// Per-session holder of the authorization snapshot and its predicates.
///
/// Clones share the same state. The resolver is the only writer; every
/// predicate reads the latest published snapshot.
#[derive(Clone)]
pub struct AuthorizationContext {
    inner: Arc<ContextInner>,
}

impl AuthorizationContext {
    /// Creates a context in the loading state with an empty snapshot.
    #[must_use]
    pub fn new(resolver: Arc<PermissionResolver>, failure_policy: FetchFailurePolicy) -> Self {
        let (state, _) = watch::channel(AuthorizationState::initial());
        Self {
            inner: Arc::new(ContextInner {
                resolver,
                failure_policy,
                state,
            }),
        }
    }

    /// Reacts to the authenticated identity changing.
    ///
    /// A new user triggers a resolution and its outcome is returned; sign-out
    /// resets the snapshot. Returns `None` when no resolution ran.
    pub async fn set_identity(&self, user: Option<&AuthenticatedUser>) -> Option<ResolveOutcome> {
        let Some(user) = user else {
            self.sign_out();
            return None;
        };

        let user_id = user.user_id();
        let changed = self.inner.state.send_if_modified(|state| {
            if state.user_id == Some(user_id) {
                return false;
            }
            *state = AuthorizationState {
                user_id: Some(user_id),
                snapshot: AuthorizationSnapshot::empty(),
                loading: true,
                last_error: None,
            };
            true
        });

        if !changed && !self.is_loading() {
            return None;
        }

        Some(self.resolve_for(user_id).await)
    }

    /// Clears the snapshot after the user signed out.
    pub fn sign_out(&self) {
        let previous = self.inner.state.send_replace(AuthorizationState {
            user_id: None,
            snapshot: AuthorizationSnapshot::empty(),
            loading: false,
            last_error: None,
        });

        if let Some(user_id) = previous.user_id {
            info!(user_id = %user_id, "cleared authorization snapshot after sign-out");
        }
    }

    /// Re-runs the resolver for the current user.
    ///
    /// Without a signed-in user nothing is fetched and an empty snapshot is
    /// reported.
    pub async fn refetch(&self) -> ResolveOutcome {
        let Some(user_id) = self.user_id() else {
            return ResolveOutcome::Resolved(AuthorizationSnapshot::empty());
        };

        self.inner.state.send_modify(|state| state.loading = true);
        self.resolve_for(user_id).await
    }

    async fn resolve_for(&self, user_id: UserId) -> ResolveOutcome {
        let outcome = self.inner.resolver.resolve(user_id).await;
        let failure_policy = self.inner.failure_policy;

        let applied = self.inner.state.send_if_modified(|state| {
            if state.user_id != Some(user_id) {
                return false;
            }

            match &outcome {
                ResolveOutcome::Resolved(snapshot) => {
                    state.snapshot = snapshot.clone();
                    state.last_error = None;
                }
                ResolveOutcome::Failed { reason } => {
                    if failure_policy == FetchFailurePolicy::ClearSnapshot {
                        state.snapshot = AuthorizationSnapshot::empty();
                    }
                    state.last_error = Some(reason.clone());
                }
            }
            state.loading = false;
            true
        });

        if !applied {
            debug!(user_id = %user_id, "discarded resolution for a user no longer signed in");
        }

        outcome
    }

    /// Returns a receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthorizationState> {
        self.inner.state.subscribe()
    }

    /// Runs `read` against the current state without cloning it.
    pub fn with_state<R>(&self, read: impl FnOnce(&AuthorizationState) -> R) -> R {
        read(&self.inner.state.borrow())
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn state(&self) -> AuthorizationState {
        self.inner.state.borrow().clone()
    }

    /// Returns a copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> AuthorizationSnapshot {
        self.inner.state.borrow().snapshot.clone()
    }

    /// Returns the signed-in user, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.inner.state.borrow().user_id
    }

    /// Returns whether a resolution is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().loading
    }

    /// Returns the reason of the most recent failed resolution.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.inner.state.borrow().last_error.clone()
    }

    /// Returns whether the snapshot holds a permission named `name`.
    #[must_use]
    pub fn has_permission(&self, name: &str) -> bool {
        self.inner.state.borrow().snapshot.has_permission(name)
    }

    /// Returns whether the snapshot holds an active role named `name`.
    #[must_use]
    pub fn has_role(&self, name: &str) -> bool {
        self.inner.state.borrow().snapshot.has_role(name)
    }

    /// Returns whether any of `names` is an active role.
    #[must_use]
    pub fn has_any_role<S: AsRef<str>>(&self, names: &[S]) -> bool {
        self.inner.state.borrow().snapshot.has_any_role(names)
    }

    /// Returns whether a permission covers `resource` and `action` exactly.
    #[must_use]
    pub fn has_resource_permission(&self, resource: &str, action: &str) -> bool {
        self.inner
            .state
            .borrow()
            .snapshot
            .has_resource_permission(resource, action)
    }

    /// Returns whether the user is an admin or super admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.inner.state.borrow().snapshot.is_admin()
    }

    /// Returns whether the user is a super admin.
    #[must_use]
    pub fn is_super_admin(&self) -> bool {
        self.inner.state.borrow().snapshot.is_super_admin()
    }
}

/// Unwraps an optionally wired context, failing when it was never provided.
///
/// A missing context is a wiring mistake, never an authorization outcome, so
/// it is reported as an internal error instead of a silent denial.
pub fn require_context(
    context: Option<&AuthorizationContext>,
) -> AppResult<&AuthorizationContext> {
    context.ok_or_else(|| {
        error!("authorization predicates used without an authorization context");
        AppError::Internal(
            "authorization context is not available; wire one into the session first".to_owned(),
        )
    })
}
