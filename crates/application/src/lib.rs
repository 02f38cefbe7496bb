//! Application services and ports.

#![forbid(unsafe_code)]

mod access_guard;
mod authorization_context;
mod authorization_ports;
mod permission_resolver;

#[cfg(test)]
mod test_support;

pub use access_guard::{AccessDeniedNotice, AccessGuard, GuardView, Guarded, with_guard};
pub use authorization_context::{
    AuthorizationContext, AuthorizationState, FetchFailurePolicy, require_context,
};
pub use authorization_ports::{
    AuthorizationStore, PermissionRecord, RolePermissionRecord, RoleRecord,
    UserRoleAssignmentRecord,
};
pub use permission_resolver::{
    Clock, PermissionResolver, ResolveOutcome, ResolverOptions, flatten_assignments,
};
