//! Membership records and the organization role model.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use memberly_core::{OrganizationId, UserId};

/// Raw persisted role name, opaque at this layer.
///
/// Whatever the storage layer holds goes in here unchanged; the closed
/// capability set is only applied when the name is resolved. Anything
/// outside that set resolves to no organization-scoped capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(Cow<'static, str>);

impl RoleName {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve against the closed role set; unknown names yield `None`.
    pub fn resolve(&self) -> Option<Role> {
        Role::from_name(self.as_str())
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved role within one organization.
///
/// Capability ordering for read/manage on organization-scoped resources is
/// admin ⊇ moderator ⊇ member; activity creation is member-and-above while
/// moderating any user's activity is moderator-and-above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    Member,
}

impl Role {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "admin" => Some(Role::Admin),
            "moderator" => Some(Role::Moderator),
            "member" => Some(Role::Member),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Moderator => "moderator",
            Role::Member => "member",
        }
    }

    /// Admins and moderators may manage other members' activity.
    pub fn can_moderate(&self) -> bool {
        matches!(self, Role::Admin | Role::Moderator)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The binding of a subject to an organization with exactly one role.
///
/// Unique per (user, organization); the persistence layer owns that
/// invariant. Snapshots that violate it anyway are resolved
/// deterministically by [`crate::User::membership_in`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: UserId,
    pub organization_id: OrganizationId,
    pub role: RoleName,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    pub fn resolved_role(&self) -> Option<Role> {
        self.role.resolve()
    }

    /// Days the member has been in the organization as of `on`.
    pub fn duration_days(&self, on: DateTime<Utc>) -> i64 {
        (on - self.joined_at).num_days().max(0)
    }
}

/// Result of looking up a subject's membership in one organization.
///
/// `ambiguous` marks the data-integrity condition where more than one row
/// existed for the same (user, organization); the returned membership is
/// then the most recently joined one.
#[derive(Debug, Clone, Copy)]
pub struct MembershipLookup<'a> {
    pub membership: Option<&'a Membership>,
    pub ambiguous: bool,
}
