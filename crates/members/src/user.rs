//! Subject snapshot and its derived facts.
//!
//! A `User` is the immutable input to one authorization evaluation: who the
//! subject is (or that they are a guest), when they were born, which
//! organizations they belong to, and any parental-consent record. Age, tier
//! and roles are derived fresh on demand; nothing is cached across calls.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use memberly_core::{OrganizationId, UserId};

use crate::age::{AgeTier, age_on};
use crate::consent::ParentalConsent;
use crate::membership::{Membership, MembershipLookup, Role};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Absent for guests (unauthenticated subjects).
    pub id: Option<UserId>,
    pub birth_date: Option<NaiveDate>,
    pub memberships: Vec<Membership>,
    pub consent: Option<ParentalConsent>,
}

impl User {
    /// An unauthenticated subject: no identity, no facts.
    pub fn guest() -> Self {
        Self {
            id: None,
            birth_date: None,
            memberships: Vec::new(),
            consent: None,
        }
    }

    pub fn persisted(&self) -> bool {
        self.id.is_some()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Age derivation
    // ─────────────────────────────────────────────────────────────────────

    pub fn age_on(&self, on: NaiveDate) -> Option<u32> {
        self.birth_date.and_then(|born| age_on(born, on))
    }

    pub fn tier_on(&self, on: NaiveDate) -> Option<AgeTier> {
        AgeTier::from_birth_date(self.birth_date, on)
    }

    /// Known to be under 18 on `on`. Unknown age is not "minor" here; the
    /// ability layer fails closed on unknown age separately.
    pub fn minor_on(&self, on: NaiveDate) -> bool {
        self.tier_on(on).is_some_and(|t| t.is_minor())
    }

    pub fn adult_on(&self, on: NaiveDate) -> bool {
        self.tier_on(on) == Some(AgeTier::Adult)
    }

    /// Participation without a consent check: adults only. Minors (and
    /// subjects of unknown age) need a currently valid consent record.
    pub fn can_participate_without_consent_at(&self, now: DateTime<Utc>) -> bool {
        self.adult_on(now.date_naive())
    }

    /// The consent gate applied to this subject's record.
    pub fn consent_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.consent.as_ref().is_some_and(|c| c.valid_at(now))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Membership and role resolution
    // ─────────────────────────────────────────────────────────────────────

    pub fn member_of(&self, organization_id: OrganizationId) -> bool {
        self.memberships
            .iter()
            .any(|m| m.organization_id == organization_id)
    }

    /// Organization ids this subject belongs to, first occurrence order,
    /// deduplicated.
    pub fn organization_ids(&self) -> Vec<OrganizationId> {
        let mut ids = Vec::new();
        for m in &self.memberships {
            if !ids.contains(&m.organization_id) {
                ids.push(m.organization_id);
            }
        }
        ids
    }

    /// Look up the unique membership row for one organization.
    ///
    /// At most one row can exist by the uniqueness invariant. If more than
    /// one exists anyway, the most recently joined row wins so the outcome
    /// stays deterministic, and the lookup is marked ambiguous for
    /// upstream alerting.
    pub fn membership_in(&self, organization_id: OrganizationId) -> MembershipLookup<'_> {
        let mut newest: Option<&Membership> = None;
        let mut count = 0usize;
        for m in &self.memberships {
            if m.organization_id != organization_id {
                continue;
            }
            count += 1;
            newest = match newest {
                Some(best) if best.joined_at >= m.joined_at => Some(best),
                _ => Some(m),
            };
        }
        MembershipLookup {
            membership: newest,
            ambiguous: count > 1,
        }
    }

    /// Resolved role in one organization; `None` for non-members and for
    /// membership rows carrying an unknown role name.
    pub fn role_in(&self, organization_id: OrganizationId) -> Option<Role> {
        self.membership_in(organization_id)
            .membership
            .and_then(Membership::resolved_role)
    }

    pub fn admin_of(&self, organization_id: OrganizationId) -> bool {
        self.role_in(organization_id) == Some(Role::Admin)
    }

    /// Admin or moderator of the organization.
    pub fn moderator_of(&self, organization_id: OrganizationId) -> bool {
        self.role_in(organization_id)
            .is_some_and(|r| r.can_moderate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::RoleName;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn membership(
        user_id: UserId,
        organization_id: OrganizationId,
        role: &'static str,
        joined: DateTime<Utc>,
    ) -> Membership {
        Membership {
            user_id,
            organization_id,
            role: RoleName::new(role),
            joined_at: joined,
        }
    }

    fn user_with(memberships: Vec<Membership>) -> User {
        User {
            id: Some(UserId::new()),
            birth_date: Some(date(1990, 1, 1)),
            memberships,
            consent: None,
        }
    }

    #[test]
    fn guest_has_no_facts() {
        let g = User::guest();
        assert!(!g.persisted());
        assert_eq!(g.age_on(date(2025, 1, 1)), None);
        assert_eq!(g.tier_on(date(2025, 1, 1)), None);
    }

    #[test]
    fn role_resolution_per_organization() {
        let uid = UserId::new();
        let org_a = OrganizationId::new();
        let org_b = OrganizationId::new();
        let joined = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let user = user_with(vec![
            membership(uid, org_a, "admin", joined),
            membership(uid, org_b, "member", joined),
        ]);

        assert_eq!(user.role_in(org_a), Some(Role::Admin));
        assert_eq!(user.role_in(org_b), Some(Role::Member));
        assert_eq!(user.role_in(OrganizationId::new()), None);
        assert!(user.admin_of(org_a));
        assert!(user.moderator_of(org_a));
        assert!(!user.moderator_of(org_b));
    }

    #[test]
    fn unknown_role_name_resolves_to_none() {
        let uid = UserId::new();
        let org = OrganizationId::new();
        let user = user_with(vec![membership(uid, org, "owner", Utc::now())]);

        assert!(user.member_of(org));
        assert_eq!(user.role_in(org), None);
    }

    #[test]
    fn duplicate_memberships_resolve_to_most_recent_and_flag() {
        let uid = UserId::new();
        let org = OrganizationId::new();
        let older = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let user = user_with(vec![
            membership(uid, org, "member", older),
            membership(uid, org, "moderator", newer),
        ]);

        let lookup = user.membership_in(org);
        assert!(lookup.ambiguous);
        assert_eq!(lookup.membership.unwrap().joined_at, newer);
        assert_eq!(user.role_in(org), Some(Role::Moderator));
    }

    #[test]
    fn participation_gate_inputs() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

        let adult = User {
            birth_date: Some(date(1990, 1, 1)),
            ..user_with(vec![])
        };
        assert!(adult.can_participate_without_consent_at(now));

        let minor = User {
            birth_date: Some(date(2012, 1, 1)),
            ..user_with(vec![])
        };
        assert!(minor.minor_on(now.date_naive()));
        assert!(!minor.can_participate_without_consent_at(now));
        assert!(!minor.consent_valid_at(now));

        let minor_with_consent = User {
            consent: Some(ParentalConsent {
                parent_name: "Pat".to_string(),
                parent_email: "pat@example.com".to_string(),
                given_at: Some(now - chrono::Duration::days(100)),
            }),
            ..minor
        };
        assert!(minor_with_consent.consent_valid_at(now));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let uid = UserId::new();
        let user = User {
            consent: Some(ParentalConsent {
                parent_name: "Pat".to_string(),
                parent_email: "pat@example.com".to_string(),
                given_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()),
            }),
            ..user_with(vec![membership(
                uid,
                OrganizationId::new(),
                "member",
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            )])
        };
        let json = serde_json::to_string(&user).unwrap();
        let back: User = serde_json::from_str(&json).unwrap();
        assert_eq!(user, back);
    }

    #[test]
    fn unknown_age_is_neither_minor_nor_adult() {
        let user = User {
            birth_date: None,
            ..user_with(vec![])
        };
        let today = date(2025, 6, 1);
        assert!(!user.minor_on(today));
        assert!(!user.adult_on(today));
    }
}
