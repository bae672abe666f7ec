//! Age and age-tier derivation.
//!
//! Age is whole elapsed years between birth date and a reference date
//! (truncating, never rounding). An unknown birth date yields no age, which
//! makes every tier-gated rule fail closed downstream. Validity of the birth
//! date itself (future dates, implausible ages) is the upstream validator's
//! job; this module just computes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Age at which a subject stops being a minor.
pub const ADULT_AGE: u32 = 18;

/// Whole elapsed years between `birth_date` and `on`.
///
/// Returns `None` when the birth date is unknown territory for the
/// arithmetic, i.e. `on` precedes `birth_date`.
pub fn age_on(birth_date: NaiveDate, on: NaiveDate) -> Option<u32> {
    on.years_since(birth_date)
}

/// Discrete age bracket gating content access.
///
/// Boundaries are inclusive: Child = [0, 12], Teen = [13, 17], Adult = 18+.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeTier {
    Child,
    Teen,
    Adult,
}

impl AgeTier {
    pub fn for_age(age: u32) -> Self {
        match age {
            0..=12 => AgeTier::Child,
            13..=17 => AgeTier::Teen,
            _ => AgeTier::Adult,
        }
    }

    /// Tier on a given date, or `None` when the birth date is absent.
    pub fn from_birth_date(birth_date: Option<NaiveDate>, on: NaiveDate) -> Option<Self> {
        birth_date
            .and_then(|born| age_on(born, on))
            .map(Self::for_age)
    }

    pub fn is_minor(&self) -> bool {
        matches!(self, AgeTier::Child | AgeTier::Teen)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeTier::Child => "child",
            AgeTier::Teen => "teen",
            AgeTier::Adult => "adult",
        }
    }
}

impl core::fmt::Display for AgeTier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
