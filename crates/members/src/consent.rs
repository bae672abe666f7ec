//! Parental consent record and the consent gate.

use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

/// How long a given consent stays valid before it must be renewed.
///
/// The window is fixed: strictly less than 24 calendar months must have
/// elapsed at evaluation time. Exactly two years elapsed means expired.
pub const CONSENT_VALIDITY_MONTHS: u32 = 24;

/// A parent's consent for a minor subject, at most one per subject.
///
/// Only meaningful for minors; a record left behind by a subject who has
/// since turned 18 is valid-but-irrelevant, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentalConsent {
    pub parent_name: String,
    pub parent_email: String,
    pub given_at: Option<DateTime<Utc>>,
}

impl ParentalConsent {
    pub fn consent_given(&self) -> bool {
        self.given_at.is_some()
    }

    /// Whether the consent has aged out of its validity window at `now`.
    ///
    /// A record with no `given_at` is not expired, just never given.
    pub fn expired_at(&self, now: DateTime<Utc>) -> bool {
        let Some(given) = self.given_at else {
            return false;
        };
        match now.checked_sub_months(Months::new(CONSENT_VALIDITY_MONTHS)) {
            Some(cutoff) => given <= cutoff,
            // `now` too far in the past to subtract from: nothing can have expired.
            None => false,
        }
    }

    /// The consent gate: given and not expired at `now`.
    ///
    /// Pure and idempotent; identical inputs always yield identical output.
    pub fn valid_at(&self, now: DateTime<Utc>) -> bool {
        self.consent_given() && !self.expired_at(now)
    }

    /// Display form used when notifying or auditing the consenting parent.
    pub fn parent_contact_info(&self) -> String {
        format!("{} ({})", self.parent_name, self.parent_email)
    }
}
