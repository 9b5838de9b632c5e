//! The user performing a mutation, as resolved by the authentication layer.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Current actor attached to every mutation for audit fields.
///
/// Only authenticated actors are ever recorded; an anonymous actor leaves
/// audit columns empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<UserId>,
    pub authenticated: bool,
}

impl Actor {
    /// An authenticated user.
    pub fn user(id: UserId) -> Self {
        Self {
            user_id: Some(id),
            authenticated: true,
        }
    }

    /// An unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// The user id to store in audit fields.
    pub fn recorded(&self) -> Option<UserId> {
        if self.authenticated { self.user_id } else { None }
    }
}
