//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod security;
mod snapshot;

pub use qrdine_core::UserId;
pub use security::{
    ADMIN_ROLE, Permission, PermissionId, Role, RoleId, SUPER_ADMIN_ROLE,
    SYSTEM_ADMIN_PERMISSION,
};
pub use snapshot::AuthorizationSnapshot;
