//! `memberly-members` — the immutable snapshot model the ability engine evaluates.
//!
//! Everything here is a read-only value handed in by the persistence layer:
//! the engine derives facts (age, tier, consent validity, roles) from these
//! snapshots on every evaluation and owns none of them.

pub mod age;
pub mod age_group;
pub mod consent;
pub mod membership;
pub mod organization;
pub mod user;

pub use age::{AgeTier, ADULT_AGE, age_on};
pub use age_group::AgeGroup;
pub use consent::{CONSENT_VALIDITY_MONTHS, ParentalConsent};
pub use membership::{Membership, MembershipLookup, Role, RoleName};
pub use organization::Organization;
pub use user::User;
