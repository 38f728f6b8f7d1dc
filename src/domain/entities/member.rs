use serde::{Deserialize, Serialize};

use super::{RoleId, User, UserId};

/// A user's membership in one guild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    pub user: User,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

impl Member {
    #[must_use]
    pub const fn new(user: User) -> Self {
        Self {
            user,
            nick: None,
            roles: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }

    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user.id()
    }

    #[must_use]
    pub fn roles(&self) -> &[RoleId] {
        &self.roles
    }
}
