//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_authorization_store;
mod postgres_authorization_store;
mod rest_authorization_store;

pub use in_memory_authorization_store::{
    AuthorizationFixture, FixtureAssignment, FixtureRole, InMemoryAuthorizationStore,
};
pub use postgres_authorization_store::PostgresAuthorizationStore;
pub use rest_authorization_store::{ASSIGNMENT_SELECT, RestAuthorizationStore};
