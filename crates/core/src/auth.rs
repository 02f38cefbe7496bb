use serde::{Deserialize, Serialize};

use crate::UserId;

/// Identity of the signed-in user as reported by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    user_id: UserId,
}

impl AuthenticatedUser {
    /// Creates an authenticated user from provider data.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
