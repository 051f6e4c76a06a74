//! Self-asserted user identity.
//!
//! Sessions are explicit context handed to the API layer: created on
//! login, updated via profile edit, dropped on logout. The role is
//! claimed by the client and never verified -- authorization enforcement
//! is out of scope by design.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Self-asserted role. Admin unlocks the operator panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

/// One client's identity for the duration of a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl UserSession {
    /// Mint a fresh session with a random user id.
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            role,
        }
    }
}
