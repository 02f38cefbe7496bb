//! Declarative gate around content that requires authorization.
//!
//! An [`AccessGuard`] collects optional conditions and evaluates them against
//! an [`AuthorizationContext`]. Conditions are OR-ed unless `require_all` is
//! set.
//!
//! A guard without any condition grants access, so a guard whose conditions
//! were forgotten exposes its content. [`AccessGuard::is_unconditional`]
//! reports such guards.

use qrdine_domain::AuthorizationSnapshot;
use serde::Serialize;
use tracing::debug;

use crate::AuthorizationContext;

/// Fixed notice shown when access is denied and no fallback was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccessDeniedNotice {
    /// Short heading.
    pub title: &'static str,
    /// Explanation shown under the heading.
    pub message: &'static str,
}

impl AccessDeniedNotice {
    /// The notice rendered by every guard.
    pub const DEFAULT: Self = Self {
        title: "Access Denied",
        message: "You don't have permission to access this resource.",
    };
}

/// What a guard renders for the current authorization state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView<T> {
    /// The snapshot is still being resolved.
    Loading,
    /// Access granted; the wrapped content unchanged.
    Granted(T),
    /// Access denied; the caller-supplied fallback.
    Fallback(T),
    /// Access denied; the generic notice.
    AccessDenied(AccessDeniedNotice),
    /// Access denied; nothing is rendered.
    Hidden,
}

impl<T> GuardView<T> {
    /// Returns whether the wrapped content was rendered.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }

    /// Returns the rendered content or fallback, if any.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Granted(value) | Self::Fallback(value) => Some(value),
            Self::Loading | Self::AccessDenied(_) | Self::Hidden => None,
        }
    }
}

/// Combination of permission, role and resource-action conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGuard {
    permission: Option<String>,
    role: Option<String>,
    any_roles: Vec<String>,
    resource_action: Option<(String, String)>,
    require_all: bool,
    show_error: bool,
}

impl Default for AccessGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessGuard {
    /// Creates a guard without conditions that shows the denial notice.
    #[must_use]
    pub fn new() -> Self {
        Self {
            permission: None,
            role: None,
            any_roles: Vec::new(),
            resource_action: None,
            require_all: false,
            show_error: true,
        }
    }

    /// Requires a permission by name.
    #[must_use]
    pub fn permission(mut self, name: impl Into<String>) -> Self {
        self.permission = Some(name.into());
        self
    }

    /// Requires an active role by name.
    #[must_use]
    pub fn role(mut self, name: impl Into<String>) -> Self {
        self.role = Some(name.into());
        self
    }

    /// Requires any of the listed roles. An empty list adds no condition.
    #[must_use]
    pub fn any_role<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.any_roles = names.into_iter().map(Into::into).collect();
        self
    }

    /// Requires a permission on `resource` for `action`.
    #[must_use]
    pub fn resource_action(mut self, resource: impl Into<String>, action: impl Into<String>) -> Self {
        self.resource_action = Some((resource.into(), action.into()));
        self
    }

    /// Requires every supplied condition instead of any.
    #[must_use]
    pub fn require_all(mut self, require_all: bool) -> Self {
        self.require_all = require_all;
        self
    }

    /// Chooses between the denial notice and rendering nothing.
    #[must_use]
    pub fn show_error(mut self, show_error: bool) -> Self {
        self.show_error = show_error;
        self
    }

    /// Returns whether the guard carries no condition and always grants.
    #[must_use]
    pub fn is_unconditional(&self) -> bool {
        self.permission.is_none()
            && self.role.is_none()
            && self.any_roles.is_empty()
            && self.resource_action.is_none()
    }

    /// Evaluates the conditions against a snapshot.
    #[must_use]
    pub fn evaluate(&self, snapshot: &AuthorizationSnapshot) -> bool {
        let mut checks = Vec::with_capacity(4);

        if let Some(permission) = &self.permission {
            checks.push(snapshot.has_permission(permission));
        }
        if let Some(role) = &self.role {
            checks.push(snapshot.has_role(role));
        }
        if !self.any_roles.is_empty() {
            checks.push(snapshot.has_any_role(self.any_roles.as_slice()));
        }
        if let Some((resource, action)) = &self.resource_action {
            checks.push(snapshot.has_resource_permission(resource, action));
        }

        if checks.is_empty() {
            return true;
        }

        if self.require_all {
            checks.into_iter().all(|passed| passed)
        } else {
            checks.into_iter().any(|passed| passed)
        }
    }

    /// Renders `children` when access is granted.
    pub fn render<T>(
        &self,
        context: &AuthorizationContext,
        children: impl FnOnce() -> T,
    ) -> GuardView<T> {
        self.render_inner(context, children, None::<fn() -> T>)
    }

    /// Renders `children` when access is granted and `fallback` otherwise.
    pub fn render_or<T>(
        &self,
        context: &AuthorizationContext,
        children: impl FnOnce() -> T,
        fallback: impl FnOnce() -> T,
    ) -> GuardView<T> {
        self.render_inner(context, children, Some(fallback))
    }

    /// Closes this guard over a component.
    #[must_use]
    pub fn wrap<C>(self, component: C) -> Guarded<C> {
        Guarded {
            guard: self,
            component,
        }
    }

    fn render_inner<T, F>(
        &self,
        context: &AuthorizationContext,
        children: impl FnOnce() -> T,
        fallback: Option<F>,
    ) -> GuardView<T>
    where
        F: FnOnce() -> T,
    {
        let decision = context.with_state(|state| {
            if state.loading {
                None
            } else {
                Some(self.evaluate(&state.snapshot))
            }
        });

        match decision {
            None => GuardView::Loading,
            Some(true) => {
                if self.is_unconditional() {
                    debug!("rendering content behind a guard without conditions");
                }
                GuardView::Granted(children())
            }
            Some(false) => match fallback {
                Some(fallback) => GuardView::Fallback(fallback()),
                None if self.show_error => GuardView::AccessDenied(AccessDeniedNotice::DEFAULT),
                None => GuardView::Hidden,
            },
        }
    }
}

/// A component pre-gated by an [`AccessGuard`].
#[derive(Debug, Clone)]
pub struct Guarded<C> {
    guard: AccessGuard,
    component: C,
}

impl<C> Guarded<C> {
    /// Returns the guard configuration.
    #[must_use]
    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    /// Renders the component with `props` when access is granted.
    pub fn render<P, T>(&self, context: &AuthorizationContext, props: P) -> GuardView<T>
    where
        C: Fn(P) -> T,
    {
        self.guard.render(context, || (self.component)(props))
    }
}

/// Wraps `component` so it only renders when `guard` grants access.
#[must_use]
pub fn with_guard<C>(component: C, guard: AccessGuard) -> Guarded<C> {
    guard.wrap(component)
}
