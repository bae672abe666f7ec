//! Resource descriptors: what authorization queries are about.
//!
//! A descriptor carries only the attributes rules match on. Callers build
//! them from whatever records they already fetched; the engine never loads
//! anything itself.

use serde::{Deserialize, Serialize};

use memberly_core::{OrganizationId, UserId};
use memberly_members::{AgeGroup, Organization};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    Organization {
        id: OrganizationId,
        active: bool,
    },
    Membership {
        organization_id: OrganizationId,
        /// Owner of the membership row, when the query is about a
        /// specific row rather than the collection.
        user_id: Option<UserId>,
    },
    User {
        /// Absent for "create a user" queries (no record exists yet).
        id: Option<UserId>,
        /// Organizations the target user belongs to, for org-scoped reads.
        organization_ids: Vec<OrganizationId>,
    },
    ParticipationActivity {
        organization_id: OrganizationId,
        user_id: Option<UserId>,
    },
    ParentalConsent {
        user_id: UserId,
    },
    AgeGroup {
        min_age: u32,
        max_age: u32,
    },
    /// Per-organization analytics dashboards.
    Analytics {
        organization_id: OrganizationId,
    },
    /// Abstract participation targets.
    AgeAppropriateContent,
    AllContent,
    /// Abstract content tiers gated purely by age.
    KidsContent,
    TeenContent,
    AdultContent,
    /// The "ask a parent for consent" flow.
    ParentalConsentRequest,
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Organization { .. } => "organization",
            Resource::Membership { .. } => "membership",
            Resource::User { .. } => "user",
            Resource::ParticipationActivity { .. } => "participation_activity",
            Resource::ParentalConsent { .. } => "parental_consent",
            Resource::AgeGroup { .. } => "age_group",
            Resource::Analytics { .. } => "analytics",
            Resource::AgeAppropriateContent => "age_appropriate_content",
            Resource::AllContent => "all_content",
            Resource::KidsContent => "kids_content",
            Resource::TeenContent => "teen_content",
            Resource::AdultContent => "adult_content",
            Resource::ParentalConsentRequest => "parental_consent_request",
        }
    }
}

impl From<&Organization> for Resource {
    fn from(org: &Organization) -> Self {
        Resource::Organization {
            id: org.id,
            active: org.active,
        }
    }
}

impl From<&AgeGroup> for Resource {
    fn from(group: &AgeGroup) -> Self {
        Resource::AgeGroup {
            min_age: group.min_age,
            max_age: group.max_age,
        }
    }
}
