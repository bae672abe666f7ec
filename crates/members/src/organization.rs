//! Organization snapshot.

use serde::{Deserialize, Serialize};

use memberly_core::OrganizationId;

use crate::user::User;

/// An organization as the engine sees it: identity plus the facts needed
/// for read/join checks. Member lists, activity stats and the like live in
/// the persistence layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub description: String,
    pub active: bool,
}

impl Organization {
    /// Join eligibility: active, and the user holds no membership here.
    pub fn can_user_join(&self, user: &User) -> bool {
        self.active && !user.member_of(self.id)
    }
}
